//! Store engine
//!
//! Owns the state tree and the bound action table, runs the dispatch
//! protocol (snapshot, compute, merge, equality gate, notify) and
//! drives listeners and the middleware chain after every effective
//! transition.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::actions::Actions;
use crate::error::StoreError;
use crate::merge::merge;
use crate::middleware::{run_chain, ActionEvent, Middleware, INIT_ACTION};
use crate::reducer::{ActionFn, Outcome, Reducer};
use crate::value::Value;

type ListenerFn = dyn Fn(&Value) + Send + Sync;

/// One reducer after binding: its mode and its action functions.
pub(crate) struct SliceEntry {
    /// Sliced reducers see and update only their own slice; unsliced
    /// (global-mode) reducers see the whole tree.
    pub(crate) sliced: bool,
    pub(crate) actions: BTreeMap<String, Arc<ActionFn>>,
}

pub(crate) struct StoreInner {
    /// The state tree. Held only to snapshot or commit; user code
    /// (actions, listeners, middlewares) always runs with it released,
    /// which is what makes re-entrant dispatch legal.
    state: Mutex<BTreeMap<String, Value>>,
    /// Immutable after construction.
    pub(crate) table: BTreeMap<String, SliceEntry>,
    listeners: Mutex<Vec<(u64, Arc<ListenerFn>)>>,
    next_listener: AtomicU64,
    middlewares: Mutex<Vec<Arc<dyn Middleware>>>,
}

/// User code never panics while a store lock is held, so a poisoned
/// lock still guards consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a store: a cheap clone over shared engine state.
///
/// Constructed via [`Store::new`] or [`Store::builder`]. Every read
/// returns a copy; the only way to change state is dispatching a bound
/// action.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Token returned by [`Store::subscribe`]; hand it back to
/// [`Store::unsubscribe`] to remove exactly that listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder {
            reducers: BTreeMap::new(),
            seed: None,
            middlewares: Vec::new(),
        }
    }

    /// Builds a store from a reducer map alone.
    pub fn new<N, I>(reducers: I) -> Result<Self, StoreError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Reducer)>,
    {
        let mut builder = Store::builder();
        for (name, reducer) in reducers {
            builder = builder.reducer(name, reducer);
        }
        builder.build()
    }

    /// A copy of the whole state tree.
    pub fn state(&self) -> Value {
        Value::Map(lock(&self.inner.state).clone())
    }

    /// The bound action table.
    pub fn actions(&self) -> Actions {
        Actions {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Registers a listener called with a copy of the new state after
    /// every effective transition, in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        Subscription { id }
    }

    /// Removes the listener the token was issued for.
    pub fn unsubscribe(&self, subscription: Subscription) {
        lock(&self.inner.listeners).retain(|(id, _)| *id != subscription.id);
    }

    /// Appends a middleware. The chain runs newest-registered first.
    pub fn add_middleware(&self, middleware: impl Middleware + 'static) {
        lock(&self.inner.middlewares).push(Arc::new(middleware));
    }
}

/// Builds a store: reducers, an optional pre-seeded state, and
/// middlewares that should already be in place for the synthetic
/// `@@init` event.
pub struct StoreBuilder {
    reducers: BTreeMap<String, Reducer>,
    seed: Option<Value>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl StoreBuilder {
    /// Registers a reducer under `name`. A repeated name replaces the
    /// earlier registration entirely, state and actions both.
    pub fn reducer(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        self.reducers.insert(name.into(), reducer);
        self
    }

    /// Pre-seeds slices before binding. A seeded value wins over the
    /// owning reducer's declared initial state on conflicting keys.
    pub fn seed(mut self, state: impl Into<Value>) -> Self {
        self.seed = Some(state.into());
        self
    }

    /// Registers a middleware before the `@@init` event fires.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Validates names, seeds state, binds actions, fires `@@init` and
    /// installs the store as the process-wide current one.
    ///
    /// On error nothing is installed: the previously built store, if
    /// any, keeps serving the process-wide accessors.
    pub fn build(self) -> Result<Store, StoreError> {
        if self.reducers.is_empty() {
            return Err(StoreError::MissingReducers);
        }

        let mut state = match self.seed {
            Some(Value::Map(map)) => map,
            Some(_) => return Err(StoreError::InvalidSeed),
            None => BTreeMap::new(),
        };

        let mut table = BTreeMap::new();
        for (name, reducer) in self.reducers {
            validate_name(&name)?;
            for action_name in reducer.actions.keys() {
                validate_name(action_name)?;
            }

            let sliced = match reducer.state {
                Some(initial) => {
                    let stored = match state.remove(&name) {
                        Some(seeded) => merge(&initial, &seeded),
                        None => initial,
                    };
                    state.insert(name.clone(), stored);
                    true
                }
                None => false,
            };

            table.insert(
                name,
                SliceEntry {
                    sliced,
                    actions: reducer.actions,
                },
            );
        }

        let store = Store {
            inner: Arc::new(StoreInner {
                state: Mutex::new(state),
                table,
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                middlewares: Mutex::new(self.middlewares),
            }),
        };

        log::debug!(
            "store built with slices: {:?}",
            store.inner.table.keys().collect::<Vec<_>>()
        );

        // Synthetic construction event: middlewares only, no listeners,
        // before any user dispatch.
        let initial = store.state();
        let chain: Vec<_> = lock(&store.inner.middlewares).clone();
        let event = ActionEvent {
            name: INIT_ACTION.to_string(),
            payload: vec![initial.clone()],
        };
        run_chain(&chain, &event, &initial);

        crate::global::install(store.clone());
        Ok(store)
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('.') {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Where a partial update lands.
enum Target {
    /// Merge into the named slice of the tree as it is at commit time.
    Slice(String),
    /// Merge into the whole tree as snapshotted at dispatch time. An
    /// overlapping dispatch that settles later overwrites this one.
    Whole(Value),
}

/// The dispatch protocol, shared by every bound action.
pub(crate) fn dispatch(
    inner: &Arc<StoreInner>,
    slice: &str,
    action: &str,
    args: Vec<Value>,
) -> Result<(), StoreError> {
    let entry = inner
        .table
        .get(slice)
        .ok_or_else(|| StoreError::UnknownSlice {
            slice: slice.to_string(),
        })?;
    let function = entry
        .actions
        .get(action)
        .ok_or_else(|| StoreError::UnknownAction {
            slice: slice.to_string(),
            action: action.to_string(),
        })?;

    let name = if entry.sliced {
        format!("{slice}.{action}")
    } else {
        format!(".{action}")
    };

    let snapshot = {
        let state = lock(&inner.state);
        if entry.sliced {
            state.get(slice).cloned().unwrap_or(Value::Null)
        } else {
            Value::Map(state.clone())
        }
    };

    let target = if entry.sliced {
        Target::Slice(slice.to_string())
    } else {
        Target::Whole(snapshot.clone())
    };

    log::trace!("dispatching '{name}'");

    let handle = Actions {
        inner: Arc::clone(inner),
    };
    let outcome = function(snapshot, handle, args.clone()).map_err(|source| {
        StoreError::Action {
            name: name.clone(),
            source,
        }
    })?;

    match outcome {
        Outcome::Skip => Ok(()),
        Outcome::Update(partial) => {
            commit(inner, &target, partial, &name, &args);
            Ok(())
        }
        Outcome::Deferred(update) => {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|_| StoreError::NoAsyncRuntime { name: name.clone() })?;
            let inner = Arc::clone(inner);
            runtime.spawn(async move {
                match update.await {
                    Ok(Some(partial)) => commit(&inner, &target, partial, &name, &args),
                    Ok(None) => log::trace!("deferred action '{name}' produced no update"),
                    // The engine's equivalent of an unhandled rejection:
                    // reported, never recovered, no update happens.
                    Err(err) => log::error!("deferred action '{name}' failed: {err}"),
                }
            });
            Ok(())
        }
    }
}

/// Merges a partial update in, gates on deep equality and notifies
/// listeners then middlewares. Runs both with the state lock released.
fn commit(inner: &Arc<StoreInner>, target: &Target, partial: Value, name: &str, payload: &[Value]) {
    let committed = {
        let mut state = lock(&inner.state);
        let next = match target {
            Target::Slice(slice) => {
                let mut tree = state.clone();
                let merged = merge(tree.get(slice).unwrap_or(&Value::Null), &partial);
                tree.insert(slice.clone(), merged);
                tree
            }
            Target::Whole(base) => match merge(base, &partial) {
                Value::Map(tree) => tree,
                other => {
                    log::warn!("discarding non-map state tree from '{name}': {other:?}");
                    return;
                }
            },
        };
        if next == *state {
            None
        } else {
            *state = next.clone();
            Some(next)
        }
    };

    let Some(new_tree) = committed else {
        log::trace!("'{name}' produced no effective change");
        return;
    };

    log::debug!("state transition via '{name}'");
    let new_state = Value::Map(new_tree);

    let listeners: Vec<Arc<ListenerFn>> = lock(&inner.listeners)
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect();
    for listener in listeners {
        listener(&new_state);
    }

    let chain: Vec<Arc<dyn Middleware>> = lock(&inner.middlewares).clone();
    let event = ActionEvent {
        name: name.to_string(),
        payload: payload.to_vec(),
    };
    run_chain(&chain, &event, &new_state);
}

#[cfg(test)]
pub(crate) mod test_lock {
    use std::sync::{Mutex, MutexGuard};

    // Construction installs the process-wide current store, so tests
    // that build stores serialize on this to keep facade assertions
    // deterministic under the parallel test runner.
    static GUARD: Mutex<()> = Mutex::new(());

    pub(crate) fn hold() -> MutexGuard<'static, ()> {
        GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
