//! Core logging bundle.
//!
//! Adds a persistent `--log-level` flag and a pre-run hook that installs
//! `env_logger` before any command body runs. The filter defaults to `warn`
//! and may be overridden by `RUST_LOG`; the flag wins over both.
use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use env_logger::{Builder, Env};
use log::{debug, info};

use glue_core::container::ContainerBuilder;
use glue_core::{Bundle, Error, ExecutionContext, PreRunner, Result};

pub const BUNDLE_NAME: &str = "core-logging";

/// Name of the persistent flag, also its `clap` id
pub const LEVEL_FLAG: &str = "log-level";

/// Shared state key holding the filter given on the command line
pub const LEVEL_STATE_KEY: &str = "log.level";

const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBundle;

impl Bundle for LoggingBundle {
    fn name(&self) -> &str {
        BUNDLE_NAME
    }

    fn build(&self, builder: &mut ContainerBuilder) -> Result<()> {
        builder.add_persistent_flag(
            Arg::new(LEVEL_FLAG)
                .long(LEVEL_FLAG)
                .value_name("LEVEL")
                .help("Log filter, e.g. `info` or `glue_core=debug`"),
        );
        builder.add_pre_runner(LoggingPreRunner);
        Ok(())
    }
}

/// Installs the global logger from the `--log-level` flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPreRunner;

#[async_trait]
impl PreRunner for LoggingPreRunner {
    async fn run(&self, ctx: &ExecutionContext, matches: &ArgMatches) -> Result<()> {
        let level = matches
            .try_get_one::<String>(LEVEL_FLAG)
            .map_err(|e| Error::bundle(BUNDLE_NAME, e))?
            .cloned();

        if init_logger(level.as_deref()) {
            info!("Logging initialized (filter: {})", level.as_deref().unwrap_or(DEFAULT_FILTER));
        }
        if let Some(level) = level {
            ctx.state().set_value(LEVEL_STATE_KEY, level);
        }
        Ok(())
    }
}

/// Install `env_logger` with an optional filter override.
///
/// Returns `false` when a logger was already installed, which is expected
/// when one process runs several executions.
pub fn init_logger(filter: Option<&str>) -> bool {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }

    match builder.try_init() {
        Ok(()) => true,
        Err(e) => {
            debug!("Logger already initialized: {}", e);
            false
        }
    }
}
