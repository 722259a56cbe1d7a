//! Error types for the command-line front end.

use std::path::PathBuf;

/// Errors that stop a formatting run.
///
/// Problems with individual files (unreadable files, parse errors, failed
/// backups) are not errors: they are logged and counted as warnings.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Neither a path nor standard input was given.
    #[error("No input: pass a file path or pipe SQL on standard input")]
    NoInput,

    /// The config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the formatting options.
    #[error("Invalid config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The search directory could not be read.
    #[error("Cannot search '{path}': {source}")]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The single output file could not be created.
    #[error("Cannot create output file '{path}': {source}")]
    OutputCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No file matched the input path and extensions.
    #[error("No files found matching '{0}'")]
    NoFilesFound(PathBuf),

    /// The formatter failed internally.
    #[error("Formatting failed: {0}")]
    Format(#[from] tsqlfmt_core::Error),

    /// IO error writing results.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a tree dump.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoInput | Self::ConfigRead { .. } | Self::ConfigParse { .. } => 1,
            Self::Path { .. } => 2,
            Self::OutputCreate { .. } => 3,
            Self::NoFilesFound(_) => 4,
            Self::Format(_) | Self::Io(_) | Self::Serialization(_) => 5,
        }
    }
}

/// Result type for command-line operations.
pub type Result<T> = std::result::Result<T, CliError>;
