//! Error taxonomy for store construction and dispatch

use thiserror::Error;

/// What a user-written action reports when it fails. The engine never
/// inspects it; it is carried to the dispatch caller (or logged, for
/// deferred settlements) as-is.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by store construction and dispatch.
///
/// Nothing here is recovered or retried internally: construction errors
/// mean no store was created, dispatch errors mean no update and no
/// notification happened.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The construction map was empty.
    #[error("at least one reducer is required")]
    MissingReducers,

    /// A slice or action name was empty or contained `.`, the
    /// qualification separator. Dotted names are how a nested action
    /// group would smuggle itself into the flat namespace.
    #[error("invalid name {name:?}: names must be non-empty and must not contain '.'")]
    InvalidName { name: String },

    /// The pre-seeded state was not a map.
    #[error("pre-seeded state must be a map")]
    InvalidSeed,

    /// Dispatch against a slice the table does not hold.
    #[error("unknown slice {slice:?}")]
    UnknownSlice { slice: String },

    /// Dispatch against an action the slice does not hold.
    #[error("unknown action {action:?} in slice {slice:?}")]
    UnknownAction { slice: String, action: String },

    /// A synchronous action failure, propagated to the dispatch caller.
    #[error("action '{name}' failed: {source}")]
    Action {
        name: String,
        #[source]
        source: ActionError,
    },

    /// An action returned a deferred update with no tokio runtime to
    /// settle it on.
    #[error("action '{name}' returned a deferred update but no async runtime is running")]
    NoAsyncRuntime { name: String },
}
