use std::path::PathBuf;
use thiserror::Error;

use crate::capability::RunResult;

/// Failures surfaced by the registry, the dependency resolver and the gateway.
///
/// Every variant is returned to the immediate caller. None of them is fatal to
/// the process; a batch of dispatches can keep going after any one fails.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No capability is registered under the requested key.
    #[error("Tool '{0}' not found")]
    UnknownCapability(String),

    /// A second registration tried to claim a key that is already taken.
    #[error("Tool '{0}' is already registered")]
    DuplicateCapability(String),

    /// Required executables are absent and were not installed.
    #[error("Missing dependencies: {}", .missing.join(", "))]
    UnsatisfiedDependency { missing: Vec<String> },

    /// An install was attempted and the package manager failed.
    #[error("Failed to install dependencies with {manager}: {detail}")]
    DependencyInstall { manager: String, detail: String },

    /// The run succeeded but its stdout could not be persisted.
    ///
    /// The captured result travels with the error so nothing is lost.
    #[error("Failed to write output to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        result: RunResult,
    },

    /// A URL parameter failed scheme or host validation.
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// A command template referenced a parameter the caller did not supply.
    #[error("Tool '{capability}' requires parameter '{param}'")]
    MissingParameter { capability: String, param: String },

    /// A parameter value would be unsafe to hand to the wrapped program.
    #[error("Invalid value for parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// The wrapped program could not be started at all.
    #[error("Failed to execute {program}: {source}")]
    Execution {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Consume the error and recover the captured run result, if any.
    pub fn into_result(self) -> Option<RunResult> {
        match self {
            ToolError::OutputWrite { result, .. } => Some(result),
            _ => None,
        }
    }
}
