use crate::bundle_system::BundleSet;
use crate::cli::{RootCommand, VersionCommand};
use crate::container::ContainerBuilder;
use crate::context::{ExecutionContext, SharedState};
use crate::kernel::constants::{CONTEXT_DEFINITION, ROOT_COMMAND_DEFINITION, STATE_DEFINITION};
use crate::kernel::error::Result;

/// Declare the definitions the lifecycle depends on.
///
/// - `glue.context` / `glue.state`: the execution context of the current run
///   and the shared state it carries.
/// - `glue.cli.root`: the root command named `root_name`, collecting every
///   contributed sub-command, persistent flag and pre-run hook.
/// - the `version` sub-command.
pub fn declare_builtins(builder: &mut ContainerBuilder, root_name: &str) -> Result<()> {
    builder.provide(CONTEXT_DEFINITION, |r| Ok::<ExecutionContext, _>(r.context().clone()))?;
    builder.provide(STATE_DEFINITION, |r| Ok::<SharedState, _>(r.context().state().clone()))?;

    let root_name = root_name.to_string();
    builder.provide(ROOT_COMMAND_DEFINITION, move |r| RootCommand::from_resolver(root_name.clone(), r))?;

    builder.add_command(VersionCommand);
    Ok(())
}

/// Built-ins first, then every bundle in dependency order.
pub fn initialize(builder: &mut ContainerBuilder, root_name: &str, bundles: &BundleSet) -> Result<Vec<String>> {
    declare_builtins(builder, root_name)?;
    bundles.register_all(builder)
}
