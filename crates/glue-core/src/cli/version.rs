use async_trait::async_trait;
use clap::{ArgMatches, Command};

use crate::cli::command::CliCommand;
use crate::cli::error::CliError;
use crate::context::ExecutionContext;
use crate::kernel::constants::VERSION_COMMAND;
use crate::kernel::error::Result;

/// Built-in `version` sub-command.
///
/// Prints the configured application version, or nothing when no version was set.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionCommand;

#[async_trait]
impl CliCommand for VersionCommand {
    fn command(&self) -> Command {
        Command::new(VERSION_COMMAND).about("Application version")
    }

    async fn run(&self, ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        if let Some(version) = ctx.state().version() {
            ctx.output().write_line(&version).map_err(CliError::Output)?;
        }
        Ok(())
    }
}
