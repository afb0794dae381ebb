//! # Glue Core Kernel Errors
//!
//! Defines the top level error type of the framework.
//!
//! [`Error`] wraps the typed errors of each subsystem (dependency resolution,
//! container, shared state, CLI) and adds the lifecycle failures raised by the
//! [`Application`](crate::kernel::Application) itself. Bundles return this
//! type from their `build` step and from commands.
use std::error::Error as StdError;
use std::result::Result as StdResult;

use crate::bundle_system::dependency::DependencyError;
use crate::cli::error::CliError;
use crate::container::error::ContainerError;
use crate::context::error::StateError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Duplicate, self, missing or circular bundle dependency
    #[error("Dependency resolution failed: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Shared state error: {0}")]
    State(#[from] StateError),

    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// An absent base context was supplied through `AppOption::context_opt`.
    #[error("nil context")]
    NilContext,

    /// Failure raised by a bundle that wants to keep its own error type.
    #[error("Bundle '{bundle}' failed: {source}")]
    Bundle {
        bundle: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Error occurring during a specific lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// The root command (or one of its sub-commands) panicked.
    #[error("Command panicked: {0}")]
    CommandPanicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Construct")]
    Construct,
    #[error("Init")]
    Init,
    #[error("Run")]
    Run,
    #[error("Teardown")]
    Teardown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    pub(crate) fn lifecycle(phase: KernelLifecyclePhase, message: impl Into<String>) -> Self {
        Error::KernelLifecycleError {
            phase,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a foreign error raised by the named bundle.
    pub fn bundle<E>(bundle: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Bundle {
            bundle: bundle.into(),
            source: Box::new(source),
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
