pub mod bundle_system;
pub mod cli;
pub mod container;
pub mod context;
pub mod kernel;

// Re-export key public types/traits for easier use by the binary and bundles
pub use kernel::{AppOption, Application, LifecycleState, StopHandle};
pub use kernel::error::{Error, KernelLifecyclePhase, Result};
pub use bundle_system::{Bundle, BundleSet, DependencyError, FnBundle};
pub use container::{Container, ContainerBuilder, Resolver};
pub use context::{ExecutionContext, Invocation, Output, SharedState};
pub use cli::{CliCommand, PreRunner, PreRunnerFn, RootCommand};
