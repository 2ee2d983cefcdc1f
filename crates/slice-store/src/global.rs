//! Process-wide convenience accessors
//!
//! A thin façade over the most recently built store, for call sites
//! that cannot have a handle threaded through to them. One instance at
//! a time: each successful construction replaces the previous one
//! wholesale. A failed construction installs nothing, so the previous
//! store keeps serving.

use std::sync::{Mutex, OnceLock, PoisonError};

use crate::actions::Actions;
use crate::store::Store;
use crate::value::Value;

static CURRENT: OnceLock<Mutex<Option<Store>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Store>> {
    CURRENT.get_or_init(|| Mutex::new(None))
}

pub(crate) fn install(store: Store) {
    *slot().lock().unwrap_or_else(PoisonError::into_inner) = Some(store);
}

/// The most recently built store, if any.
pub fn current_store() -> Option<Store> {
    slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// A copy of the current store's state tree.
pub fn current_state() -> Option<Value> {
    current_store().map(|store| store.state())
}

/// The current store's bound action table.
pub fn current_actions() -> Option<Actions> {
    current_store().map(|store| store.actions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::reducer::{Outcome, Reducer};
    use crate::store::test_lock;

    fn probe_reducer() -> Reducer {
        Reducer::new()
            .action("add", |state, _actions, mut args| {
                let mut items = state.into_array().unwrap_or_default();
                if !args.is_empty() {
                    items.push(args.remove(0));
                }
                Ok(Outcome::Update(Value::Array(items)))
            })
            .with_state(Value::array())
    }

    #[test]
    fn accessors_mirror_the_latest_store() {
        let _guard = test_lock::hold();

        let store = Store::new([("facade_probe", probe_reducer())]).unwrap();
        assert_eq!(current_state(), Some(store.state()));

        let actions = current_actions().unwrap();
        assert!(actions.contains_action("facade_probe", "add"));

        // Mutations through the façade are visible on the handle.
        actions
            .invoke("facade_probe", "add", vec![Value::from("x")])
            .unwrap();
        assert_eq!(
            store.state().get("facade_probe"),
            Some(&Value::from(vec!["x"]))
        );
        assert_eq!(current_state(), Some(store.state()));
    }

    #[test]
    fn failed_construction_keeps_the_previous_store() {
        let _guard = test_lock::hold();

        let store = Store::new([("survivor", probe_reducer())]).unwrap();

        let result = Store::new([("bad.name", probe_reducer())]);
        assert!(matches!(result, Err(StoreError::InvalidName { .. })));

        // The façade still points at the working store.
        let actions = current_actions().unwrap();
        assert!(actions.contains("survivor"));
        assert_eq!(current_state(), Some(store.state()));
    }
}
