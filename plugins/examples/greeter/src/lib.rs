//! Example bundle contributing the `greet` and `wait` commands.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use log::{debug, info};

use glue_core::container::ContainerBuilder;
use glue_core::{Bundle, CliCommand, ExecutionContext, Result};

pub const BUNDLE_NAME: &str = "greeter";

/// Container definition holding the shared [`Greeter`]
pub const GREETER_DEFINITION: &str = "greeter.greeter";

const DEFAULT_NAME: &str = "world";

/// Formats greetings and counts how many it handed out.
#[derive(Debug)]
pub struct Greeter {
    salutation: String,
    greeted: AtomicUsize,
}

impl Greeter {
    pub fn new(salutation: impl Into<String>) -> Self {
        Self {
            salutation: salutation.into(),
            greeted: AtomicUsize::new(0),
        }
    }

    pub fn greet(&self, name: &str) -> String {
        self.greeted.fetch_add(1, Ordering::Relaxed);
        format!("{}, {}!", self.salutation, name)
    }

    pub fn greeted(&self) -> usize {
        self.greeted.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct GreeterBundle {
    salutation: String,
}

impl GreeterBundle {
    pub fn new(salutation: impl Into<String>) -> Self {
        Self {
            salutation: salutation.into(),
        }
    }
}

impl Default for GreeterBundle {
    fn default() -> Self {
        Self::new("Hello")
    }
}

impl Bundle for GreeterBundle {
    fn name(&self) -> &str {
        BUNDLE_NAME
    }

    fn depends_on(&self) -> Vec<String> {
        vec![core_logging::BUNDLE_NAME.to_string()]
    }

    fn build(&self, builder: &mut ContainerBuilder) -> Result<()> {
        let salutation = self.salutation.clone();
        builder.provide_with_close(
            GREETER_DEFINITION,
            move |_| Ok(Greeter::new(salutation.clone())),
            |greeter: &Greeter| {
                info!("Greeter released after {} greeting(s)", greeter.greeted());
                Ok(())
            },
        )?;

        builder.add_command_with(|r| {
            let greeter = r.resolve::<Greeter>(GREETER_DEFINITION)?;
            Ok(Arc::new(GreetCommand { greeter }) as Arc<dyn CliCommand>)
        });
        builder.add_command(WaitCommand);
        Ok(())
    }
}

pub struct GreetCommand {
    greeter: Arc<Greeter>,
}

#[async_trait]
impl CliCommand for GreetCommand {
    fn command(&self) -> Command {
        Command::new("greet").about("Print a greeting").arg(
            Arg::new("name")
                .long("name")
                .value_name("NAME")
                .default_value(DEFAULT_NAME)
                .help("Who to greet"),
        )
    }

    async fn run(&self, ctx: &ExecutionContext, matches: &ArgMatches) -> Result<()> {
        let name = matches
            .get_one::<String>("name")
            .map(String::as_str)
            .unwrap_or(DEFAULT_NAME);
        if let Some(path) = ctx.state().app_path() {
            debug!("Greeting from {}", path.display());
        }
        ctx.output().write_line(&self.greeter.greet(name))?;
        Ok(())
    }
}

/// Blocks until the execution is cancelled, e.g. by Ctrl-C.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitCommand;

#[async_trait]
impl CliCommand for WaitCommand {
    fn command(&self) -> Command {
        Command::new("wait").about("Wait until interrupted")
    }

    async fn run(&self, ctx: &ExecutionContext, _matches: &ArgMatches) -> Result<()> {
        ctx.output().write_line("waiting for cancellation")?;
        ctx.cancelled().await;
        ctx.output().write_line("cancelled")?;
        Ok(())
    }
}
