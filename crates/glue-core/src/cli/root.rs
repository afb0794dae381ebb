use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, Command};

use crate::cli::command::{CliCommand, PreRunner};
use crate::cli::error::CliError;
use crate::container::Resolver;
use crate::context::{ExecutionContext, Invocation};
use crate::kernel::constants::DEFAULT_ROOT_NAME;
use crate::kernel::error::Result;

/// Top-level command assembled from every contribution in the container.
pub struct RootCommand {
    name: String,
    commands: Vec<(String, Arc<dyn CliCommand>)>,
    persistent_flags: Vec<Arg>,
    pre_runners: Vec<Arc<dyn PreRunner>>,
}

impl RootCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            persistent_flags: Vec::new(),
            pre_runners: Vec::new(),
        }
    }

    /// Invocation name derived from `argv[0]`: its file name, or a fallback.
    pub fn name_from_args(args: &[OsString]) -> String {
        args.first()
            .and_then(|arg0| Path::new(arg0).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_NAME.to_string())
    }

    /// Collect sub-commands, persistent flags and pre-run hooks from the container.
    pub fn from_resolver(name: impl Into<String>, resolver: &Resolver<'_>) -> Result<Self> {
        let mut root = Self::new(name);
        for command in resolver.commands()? {
            root.add_command(command)?;
        }
        for flag in resolver.persistent_flags() {
            root.add_persistent_flag(flag.clone());
        }
        for pre_runner in resolver.pre_runners() {
            root.add_pre_runner(pre_runner.clone());
        }
        Ok(root)
    }

    pub fn add_command(&mut self, command: Arc<dyn CliCommand>) -> Result<()> {
        let name = command.command().get_name().to_string();
        if self.commands.iter().any(|(existing, _)| *existing == name) {
            return Err(CliError::DuplicateCommand(name).into());
        }
        self.commands.push((name, command));
        Ok(())
    }

    pub fn add_persistent_flag(&mut self, flag: Arg) {
        self.persistent_flags.push(flag.global(true));
    }

    pub fn add_pre_runner(&mut self, pre_runner: Arc<dyn PreRunner>) {
        self.pre_runners.push(pre_runner);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> String {
        format!("{} [command]", self.name)
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The clap declaration of the whole command tree.
    pub fn clap_command(&self) -> Command {
        let mut command = Command::new(self.name.clone())
            .override_usage(self.usage())
            .disable_version_flag(true);
        for flag in &self.persistent_flags {
            command = command.arg(flag.clone());
        }
        for (_, sub) in &self.commands {
            command = command.subcommand(sub.command());
        }
        command
    }

    /// Parse `args` (program name first) and run the selected sub-command.
    ///
    /// Help and a missing sub-command print the help text and succeed. Parse
    /// errors are returned without usage text. Before any pre-run hook, the
    /// invocation is written to shared state.
    pub async fn execute(&self, ctx: &ExecutionContext, args: Vec<OsString>) -> Result<()> {
        let mut command = self.clap_command();
        let matches = match command.try_get_matches_from_mut(args.clone()) {
            Ok(matches) => matches,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        ctx.output()
                            .write_str(&e.render().to_string())
                            .map_err(CliError::Output)?;
                        Ok(())
                    }
                    _ => Err(CliError::Parse(first_line(&e.render().to_string())).into()),
                };
            }
        };

        let Some((name, sub_matches)) = matches.subcommand() else {
            ctx.output()
                .write_str(&command.render_help().to_string())
                .map_err(CliError::Output)?;
            return Ok(());
        };

        let invocation = Invocation {
            command: command_path(&self.name, &matches),
            args: positional_args(&command, &matches),
        };
        drop(command);
        log::debug!("Invoking {:?}", invocation.command);
        ctx.state().set_invocation(invocation);

        for pre_runner in &self.pre_runners {
            pre_runner.run(ctx, sub_matches).await?;
        }

        let Some((_, sub)) = self.commands.iter().find(|(existing, _)| existing == name) else {
            return Err(CliError::UnknownCommand(name.to_string()).into());
        };
        sub.run(ctx, sub_matches).await
    }
}

impl fmt::Debug for RootCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCommand")
            .field("name", &self.name)
            .field("commands", &self.command_names())
            .field("persistent_flags", &self.persistent_flags.len())
            .field("pre_runners", &self.pre_runners.len())
            .finish()
    }
}

fn command_path(root: &str, matches: &ArgMatches) -> Vec<String> {
    let mut path = vec![root.to_string()];
    let mut current = matches;
    while let Some((name, sub_matches)) = current.subcommand() {
        path.push(name.to_string());
        current = sub_matches;
    }
    path
}

/// Positional values given to the innermost invoked command.
fn positional_args(command: &Command, matches: &ArgMatches) -> Vec<String> {
    let (mut command, mut current) = (command, matches);
    while let Some((name, sub_matches)) = current.subcommand() {
        let Some(sub) = command.find_subcommand(name) else {
            break;
        };
        command = sub;
        current = sub_matches;
    }

    command
        .get_positionals()
        .map(|arg| arg.get_id().as_str())
        .filter(|id| current.value_source(id) == Some(ValueSource::CommandLine))
        .filter_map(|id| current.try_get_raw(id).ok().flatten())
        .flatten()
        .map(|value| value.to_string_lossy().into_owned())
        .collect()
}

// clap renders "error: <message>" followed by usage and a hint
fn first_line(rendered: &str) -> String {
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
