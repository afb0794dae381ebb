//! # Glue Core Context
//!
//! Shared state and the cancelable execution context.
//!
//! - [`SharedState`]: one instance per application, shared by reference with
//!   every bundle and command. Well-known keys are typed fields; bundles may
//!   add their own typed values under string keys.
//! - [`ExecutionContext`]: carries the cancellation token of one run, the
//!   shared state, the output sink and an immutable chain of values.
//! - [`Output`]: where commands write user-facing text.
pub mod error;
pub mod execution;
pub mod output;
pub mod state;

pub use error::StateError;
pub use execution::ExecutionContext;
pub use output::Output;
pub use state::{Invocation, SharedState};
