use thiserror::Error;

/// Errors the engine surfaces to its caller.
///
/// Everything else (nonzero exits, stderr output, timeouts, truncated
/// capture, cleanup failures) is data in [`crate::ExecutionResult`] or a
/// logged warning, never an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The language id is not in the profile table. Rejected before any
    /// workspace or sandbox side effect.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The isolation layer itself could not start (missing runtime or
    /// image, workspace setup failure). An environment fault, never
    /// attributable to the submitted code.
    #[error("sandbox launch failed: {0:#}")]
    LaunchFailure(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
