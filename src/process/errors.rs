//! Subprocess failure kinds.

use std::time::Duration;
use thiserror::Error;

/// Why a subprocess could not produce a [`CommandOutput`](super::CommandOutput).
///
/// A process that ran and exited non-zero is not an error at this layer;
/// callers inspect [`CommandOutput::exit_code`](super::CommandOutput::exit_code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The program is not on PATH.
    #[error("{program}: command not found")]
    NotFound { program: String },

    /// The program exists but could not be executed.
    #[error("{program}: permission denied")]
    PermissionDenied { program: String },

    /// The process outlived its time limit and was killed.
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// Any other spawn or wait failure.
    #[error("{program}: {message}")]
    Io { program: String, message: String },
}

impl ProcessError {
    pub(crate) fn from_io(program: &str, err: &std::io::Error) -> Self {
        let program = program.to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { program },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { program },
            _ => Self::Io {
                program,
                message: err.to_string(),
            },
        }
    }
}
