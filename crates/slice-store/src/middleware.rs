//! Middleware chain
//!
//! Middlewares observe every effective state transition, after the
//! state was replaced and listeners were notified. The chain runs
//! newest-registered first; each middleware decides whether the rest of
//! the chain runs by calling (or not calling) `next`.

use std::sync::Arc;

use crate::value::Value;

/// Reserved action name of the synthetic event fired once after store
/// construction, before any user dispatch. Its payload is the seeded
/// initial state.
pub const INIT_ACTION: &str = "@@init";

/// A state transition as the middleware chain sees it: the
/// fully-qualified action name (`"<slice>.<action>"`, or `".<action>"`
/// for a reducer bound in global mode) and the original call arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub name: String,
    pub payload: Vec<Value>,
}

impl ActionEvent {
    /// Whether this is the synthetic construction event.
    pub fn is_init(&self) -> bool {
        self.name == INIT_ACTION
    }
}

/// A post-transition interceptor with explicit continuation control.
///
/// `state` is a snapshot of the state the transition produced. Not
/// calling `next` truncates the chain toward earlier-registered
/// middlewares; this is the hook point for gating further propagation.
pub trait Middleware: Send + Sync {
    fn handle(&self, event: &ActionEvent, state: &Value, next: &mut dyn FnMut());
}

/// Plain closures are middlewares.
impl<F> Middleware for F
where
    F: Fn(&ActionEvent, &Value, &mut dyn FnMut()) + Send + Sync,
{
    fn handle(&self, event: &ActionEvent, state: &Value, next: &mut dyn FnMut()) {
        self(event, state, next)
    }
}

/// Runs the chain newest-first, terminating in a no-op.
pub(crate) fn run_chain(chain: &[Arc<dyn Middleware>], event: &ActionEvent, state: &Value) {
    run_from(chain, chain.len(), event, state)
}

fn run_from(chain: &[Arc<dyn Middleware>], position: usize, event: &ActionEvent, state: &Value) {
    if position == 0 {
        return;
    }
    let middleware = &chain[position - 1];
    middleware.handle(event, state, &mut || {
        run_from(chain, position - 1, event, state)
    });
}
