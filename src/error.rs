/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/error.rs
 * Responsibility: Typed error taxonomies for tool execution and the oracle boundary.
 */

use thiserror::Error;

/// Everything that can go wrong inside a tool operation. None of these are
/// fatal: the registry renders each kind into a string payload that the
/// oracle consumes as ordinary data.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Cannot access \"{0}\" as it is outside the permitted working directory")]
    OutsideSandbox(String),

    #[error("\"{0}\" is not a directory")]
    NotADirectory(String),

    #[error("File not found or is not a regular file: \"{0}\"")]
    NotAFile(String),

    #[error("Cannot write to \"{0}\" as it is a directory")]
    IsADirectory(String),

    #[error("\"{0}\" does not exist or is not a regular file")]
    MissingScript(String),

    #[error("\"{0}\" is not a Python file")]
    WrongExtension(String),

    #[error("executing \"{path}\" timed out after {seconds} seconds")]
    Timeout { path: String, seconds: u64 },

    #[error("invalid arguments for {name}: {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Faults at the oracle boundary. Unlike tool errors these are fatal: the
/// agent loop aborts the run when the oracle breaks its contract.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle response did not include usage metadata")]
    MissingUsage,

    #[error("Gemini API error (model {model}): {body}")]
    Api { model: String, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
