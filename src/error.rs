//! Error types shared by the loader, the LP backends and the solver.

use thiserror::Error;

/// Failure to build an [`Instance`](crate::instance::Instance).
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("cannot read instance file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid instance: {0}")]
    Invalid(String),

    #[error("dataset {name} not found in {dir}")]
    NotFound { name: String, dir: String },
}

impl InstanceError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        InstanceError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Failure reported by a restricted master backend.
#[derive(Debug, Error)]
pub enum LpError {
    #[error("LP backend error: {0}")]
    Backend(String),

    #[error("model has not been optimized")]
    NotSolved,

    #[error("LP backend `{0}` is not enabled in this build")]
    Unavailable(&'static str),
}

/// Top-level error returned by the solver API.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Lp(#[from] LpError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}
