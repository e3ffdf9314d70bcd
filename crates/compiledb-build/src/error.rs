//! Error types for compiledb-build.

use std::process::ExitStatus;
use thiserror::Error;

/// Result type for compiledb-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while generating a compilation database.
#[derive(Error, Debug)]
pub enum BuildError {
    /// I/O failure reading the build log or writing the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Failed to parse or serialize JSON (compile_commands.json).
    #[error("Failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// No keyboard given on the command line or in the config.
    #[error("Could not determine keyboard!")]
    MissingKeyboard,

    /// No keymap given on the command line or in the config.
    #[error("Could not determine keymap!")]
    MissingKeymap,

    /// The build tool could not be started.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The dry-run build exited unsuccessfully.
    #[error("Got error from: `{command}` ({status})")]
    CommandFailed { command: String, status: ExitStatus },
}
