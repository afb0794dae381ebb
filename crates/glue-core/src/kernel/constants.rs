/// Application name
pub const APP_NAME: &str = "Glue";

/// Fallback invocation name when `argv[0]` is missing or has no file name
pub const DEFAULT_ROOT_NAME: &str = "app";

/// Container definition holding the execution context of the current run
pub const CONTEXT_DEFINITION: &str = "glue.context";

/// Container definition holding the shared state
pub const STATE_DEFINITION: &str = "glue.state";

/// Container definition holding the assembled root command
pub const ROOT_COMMAND_DEFINITION: &str = "glue.cli.root";

/// Name of the built-in version sub-command
pub const VERSION_COMMAND: &str = "version";

/// Default scope hierarchy, outermost first
pub const DEFAULT_SCOPES: [&str; 2] = ["app", "request"];
