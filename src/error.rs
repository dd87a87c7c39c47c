use thiserror::Error;

/// Failures from the repository gateway.
///
/// Cloneable so a failure can ride inside a result message back to the UI loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),
    #[error("{path} does not exist at {stage}")]
    NotFound { path: String, stage: &'static str },
    #[error("patch rejected: {0}")]
    PatchApply(String),
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },
}

/// Failures from an external renderer invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{label} exited with status {code}: {stderr}")]
    Exit {
        label: String,
        code: i32,
        stderr: String,
    },
    #[error("failed to run {label}: {message}")]
    Spawn { label: String, message: String },
    #[error("render scratch space: {0}")]
    Io(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}
