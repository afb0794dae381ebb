//! # Glue Core Kernel
//!
//! The `kernel` module owns the application lifecycle. It turns a list of
//! [`AppOption`]s into an [`Application`], registers the built-in definitions
//! and every bundle into the container, and drives one execution at a time.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Construction**: [`Application::new`](bootstrap::Application::new) applies
//!   options in order and aborts on the first configuration or registration error.
//! - **Initialization**: the built-ins and bundle registration live in the
//!   `initializer` submodule.
//! - **Execution**: [`Application::execute`](bootstrap::Application::execute) wires
//!   SIGINT/SIGTERM to cancellation, builds the container, runs the root command
//!   and always tears the container down.
//! - **Error Handling**: kernel error types ([`Error`](error::Error)) and
//!   a `Result` type alias in the `error` submodule.
pub mod bootstrap;
pub mod constants;
pub mod error;
pub mod initializer;
pub mod options;
mod signal;

pub use bootstrap::{Application, LifecycleState, StopHandle};
pub use error::{Error, KernelLifecyclePhase, Result};
pub use options::AppOption;

// Test module declaration
#[cfg(test)]
mod tests;
