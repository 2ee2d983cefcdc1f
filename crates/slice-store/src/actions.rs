//! Bound action table
//!
//! The read-only registry mapping `(slice, action)` to a dispatcher.
//! Invoking an entry runs the full dispatch protocol (snapshot, compute,
//! merge, notify); the caller never sees or supplies slice state.
//! Read-only-ness is by construction: the handle exposes no mutating
//! API, so "writing to the actions table" is not expressible.

use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{self, StoreInner};
use crate::value::Value;

/// Cheap cloneable handle over the bound action table of one store.
///
/// Action functions receive one of these for cross-slice calls; every
/// call re-enters the dispatch protocol from the top.
#[derive(Clone)]
pub struct Actions {
    pub(crate) inner: Arc<StoreInner>,
}

impl Actions {
    /// Dispatches `slice.action` with positional arguments.
    ///
    /// Returns as soon as the action function produced its outcome; a
    /// deferred update settles later without blocking the caller. A
    /// synchronous action failure propagates here untouched.
    pub fn invoke(
        &self,
        slice: &str,
        action: &str,
        args: Vec<Value>,
    ) -> Result<(), StoreError> {
        store::dispatch(&self.inner, slice, action, args)
    }

    /// Whether `slice` is registered.
    pub fn contains(&self, slice: &str) -> bool {
        self.inner.table.contains_key(slice)
    }

    /// Whether `slice.action` is registered.
    pub fn contains_action(&self, slice: &str, action: &str) -> bool {
        self.inner
            .table
            .get(slice)
            .is_some_and(|entry| entry.actions.contains_key(action))
    }

    /// Registered slice names, in name order.
    pub fn slices(&self) -> impl Iterator<Item = &str> {
        self.inner.table.keys().map(String::as_str)
    }

    /// Action names registered under `slice`, in name order.
    pub fn actions_of(&self, slice: &str) -> Option<impl Iterator<Item = &str>> {
        self.inner
            .table
            .get(slice)
            .map(|entry| entry.actions.keys().map(String::as_str))
    }
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (slice, entry) in &self.inner.table {
            map.entry(&slice, &entry.actions.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
