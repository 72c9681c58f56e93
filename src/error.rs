//! Failure taxonomy for the capture core.
//!
//! Collaborators (camera, registry, detection service, archive) report failures as
//! `anyhow::Error`; the controller translates them into one of these variants at the
//! boundary so the display layer only ever sees three kinds of problem.

/// Result type alias
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Camera unavailable or permission denied. Terminal for the attempt.
    #[error("Camera error: {0}")]
    Acquisition(String),

    /// Operation refused in the current state.
    #[error("{0}")]
    Validation(String),

    /// Session registry, detection or archive call failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CaptureError {
    pub fn validation(message: impl Into<String>) -> Self {
        CaptureError::Validation(message.into())
    }

    pub fn acquisition(err: anyhow::Error) -> Self {
        CaptureError::Acquisition(format!("{err:#}"))
    }

    pub fn transport(err: anyhow::Error) -> Self {
        CaptureError::Transport(format!("{err:#}"))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CaptureError::Validation(_))
    }
}
