//! # Glue Core CLI
//!
//! The command line surface assembled from bundle contributions.
//!
//! Bundles contribute [`CliCommand`]s, persistent flags and [`PreRunner`]s to
//! the container builder. At run time the application resolves the
//! [`RootCommand`], which parses the arguments with `clap`, records the
//! invocation in shared state, runs every pre-run hook in registration order
//! and dispatches to the selected sub-command.
pub mod command;
pub mod error;
pub mod root;
pub mod version;

pub use command::{CliCommand, PreRunner, PreRunnerFn};
pub use error::CliError;
pub use root::RootCommand;
pub use version::VersionCommand;
