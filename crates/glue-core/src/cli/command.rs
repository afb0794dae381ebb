use std::fmt;

use async_trait::async_trait;
use clap::{ArgMatches, Command};

use crate::context::ExecutionContext;
use crate::kernel::error::Result;

/// A sub-command contributed to the root command.
#[async_trait]
pub trait CliCommand: Send + Sync {
    /// Declaration of the command: name, help, arguments and nested sub-commands.
    fn command(&self) -> Command;

    /// Run the command body. Long running commands should watch
    /// [`ExecutionContext::cancelled`] and return once it fires.
    async fn run(&self, ctx: &ExecutionContext, matches: &ArgMatches) -> Result<()>;
}

/// A hook run before any sub-command body.
///
/// `matches` are the invoked sub-command's matches, persistent flags included.
#[async_trait]
pub trait PreRunner: Send + Sync {
    async fn run(&self, ctx: &ExecutionContext, matches: &ArgMatches) -> Result<()>;
}

/// Adapter turning a plain function into a [`PreRunner`].
pub struct PreRunnerFn<F>(F);

impl<F> PreRunnerFn<F>
where
    F: Fn(&ExecutionContext, &ArgMatches) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> PreRunner for PreRunnerFn<F>
where
    F: Fn(&ExecutionContext, &ArgMatches) -> Result<()> + Send + Sync,
{
    async fn run(&self, ctx: &ExecutionContext, matches: &ArgMatches) -> Result<()> {
        (self.0)(ctx, matches)
    }
}

impl<F> fmt::Debug for PreRunnerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PreRunnerFn")
    }
}
