//! Reducer descriptors
//!
//! A reducer is a named bundle of action functions plus an optional
//! initial state slice. Descriptors are pure data: nothing is validated
//! or bound until the store is built.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::actions::Actions;
use crate::error::ActionError;
use crate::value::Value;

/// A deferred partial update: resolves to `Some(partial)` to merge,
/// `None` for a no-op, or an error (logged, never raised).
pub type DeferredUpdate =
    Pin<Box<dyn Future<Output = Result<Option<Value>, ActionError>> + Send>>;

/// What an action produced.
pub enum Outcome {
    /// Nothing to change. No listener or middleware will hear about it.
    Skip,
    /// A partial value merged into the slice (or the whole tree, for a
    /// reducer bound in global mode).
    Update(Value),
    /// The update resolves later; dispatch returns before it lands.
    Deferred(DeferredUpdate),
}

impl Outcome {
    /// A partial update.
    pub fn update(value: impl Into<Value>) -> Self {
        Outcome::Update(value.into())
    }

    /// A deferred partial update settled on the ambient runtime.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<Value>, ActionError>> + Send + 'static,
    {
        Outcome::Deferred(Box::pin(future))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Update(value)
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Skip => f.write_str("Skip"),
            Outcome::Update(value) => f.debug_tuple("Update").field(value).finish(),
            Outcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// The single calling convention for action functions: a snapshot of
/// the relevant state, the bound action table for cross-slice calls,
/// and the positional call arguments.
pub type ActionFn =
    dyn Fn(Value, Actions, Vec<Value>) -> Result<Outcome, ActionError> + Send + Sync;

/// A named bundle of actions plus an optional initial state slice.
///
/// Declaring an initial state (even an empty map or array) binds the
/// actions in sliced mode: they see and update only their own slice.
/// Declaring none binds them in global mode: they see the whole state
/// tree and their updates merge into it. That difference is the whole
/// point of leaving `state` unset, so an empty initial value and no
/// initial value are not interchangeable.
pub struct Reducer {
    pub(crate) actions: BTreeMap<String, Arc<ActionFn>>,
    pub(crate) state: Option<Value>,
}

impl Reducer {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
            state: None,
        }
    }

    /// Register an action under `name`. A repeated name replaces the
    /// earlier registration.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Value, Actions, Vec<Value>) -> Result<Outcome, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Declare the initial state slice, switching the reducer to sliced
    /// binding mode.
    pub fn with_state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Whether this reducer declared an initial state slice.
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// The declared action names, in name order.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_pure_data() {
        let reducer = Reducer::new()
            .action("add", |state, _actions, mut args| {
                let mut items = state.into_array().unwrap_or_default();
                if !args.is_empty() {
                    items.push(args.remove(0));
                }
                Ok(Outcome::Update(Value::Array(items)))
            })
            .with_state(Value::array());

        assert!(reducer.has_state());
        assert_eq!(reducer.action_names().collect::<Vec<_>>(), vec!["add"]);
    }

    #[test]
    fn empty_state_and_no_state_differ() {
        let stateless = Reducer::new().action("noop", |_, _, _| Ok(Outcome::Skip));
        let stateful = Reducer::new()
            .action("noop", |_, _, _| Ok(Outcome::Skip))
            .with_state(Value::map());

        assert!(!stateless.has_state());
        assert!(stateful.has_state());
    }
}
