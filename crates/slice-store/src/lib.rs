//! Minimal global state container
//!
//! This crate provides:
//! - A recursive [`Value`] model with deep merge semantics (source wins
//!   scalar conflicts, arrays overwrite, untouched keys survive)
//! - Reducers: named bundles of actions over named state slices
//! - A store engine that snapshots, merges and gates every transition
//!   on deep equality before notifying anyone
//! - Listeners and a newest-first middleware chain with explicit
//!   continuation control
//! - Process-wide convenience accessors over the latest store
//!
//! ```
//! use slice_store::{Outcome, Reducer, Store, Value};
//!
//! let store = Store::new([(
//!     "list",
//!     Reducer::new()
//!         .action("add", |state: Value, _actions, mut args: Vec<Value>| {
//!             let mut items = state.into_array().unwrap_or_default();
//!             items.push(args.remove(0));
//!             Ok(Outcome::Update(Value::Array(items)))
//!         })
//!         .with_state(Value::array()),
//! )])?;
//!
//! store.actions().invoke("list", "add", vec![Value::from("milk")])?;
//! assert_eq!(
//!     store.state().get("list"),
//!     Some(&Value::from(vec!["milk"]))
//! );
//! # Ok::<(), slice_store::StoreError>(())
//! ```

pub mod actions;
pub mod error;
pub mod global;
pub mod merge;
pub mod middleware;
pub mod reducer;
pub mod store;
pub mod value;

pub use actions::Actions;
pub use error::{ActionError, StoreError};
pub use global::{current_actions, current_state, current_store};
pub use merge::merge;
pub use middleware::{ActionEvent, Middleware, INIT_ACTION};
pub use reducer::{ActionFn, DeferredUpdate, Outcome, Reducer};
pub use store::{Store, StoreBuilder, Subscription};
pub use value::Value;
