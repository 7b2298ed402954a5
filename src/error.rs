//! Error types for tool resolution, installation and subprocess launches
//!
//! Only `InvalidArgument` is a call-site bug; every other variant is a runtime
//! condition that callers turn into a log line plus an incident record.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the orchestration layer
#[derive(Debug, Error)]
pub enum ToolError {
    /// Empty argv, package name, tool list, prompt or script
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The OS refused to start the executable
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// No node runtime in the portable layout nor on PATH
    #[error("portable Node runtime not found; place a Node distribution in {}", expected.display())]
    NodeMissing { expected: PathBuf },

    /// Node was found but its bundled npm entry point was not
    #[error("npm-cli.js not found next to {}; check that the Node distribution ships npm", node.display())]
    NpmMissing { node: PathBuf },

    /// No Python interpreter in the portable layout nor on PATH
    #[error("no Python interpreter found (tools/python or python3/python on PATH)")]
    PythonMissing,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ToolError {
    /// Shorthand for an `InvalidArgument` error
    pub fn invalid(what: impl Into<String>) -> Self {
        ToolError::InvalidArgument(what.into())
    }

    /// True when the executable itself could not be found
    pub fn is_not_found(&self) -> bool {
        match self {
            ToolError::Spawn { source, .. } => source.kind() == io::ErrorKind::NotFound,
            ToolError::NodeMissing { .. } | ToolError::PythonMissing => true,
            _ => false,
        }
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_not_found_is_classified() {
        let err = ToolError::Spawn {
            program: "codex".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("codex"));

        let denied = ToolError::Spawn {
            program: "codex".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!denied.is_not_found());
        assert!(!ToolError::invalid("argv").is_not_found());
    }
}
