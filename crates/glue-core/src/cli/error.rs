use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing failed; holds clap's message without the usage text
    #[error("{0}")]
    Parse(String),

    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("command \"{0}\" is contributed more than once")]
    DuplicateCommand(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
