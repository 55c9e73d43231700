//! Error types for cci-tasks

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running tasks
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error (gh output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unreadable project configuration
    #[error("{0}")]
    Config(String),

    /// An external program could not be found on PATH
    #[error("program not found: {0}")]
    ProgramNotFound(String),

    /// An external command exited unsuccessfully
    #[error("command `{command}` failed with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// A task precondition was not met
    #[error("{0}")]
    Precondition(String),

    /// GNU triplet parse or conversion error
    #[error("triplet error: {0}")]
    Triplet(String),

    /// A recipe export/upload failed
    #[error("error exporting/uploading {package}: {source}")]
    Upload {
        /// Package that failed
        package: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The recipe selection could not be resolved
    #[error("package selection: {0}")]
    PackageSelection(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"))
}
