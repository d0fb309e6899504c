//! Error types shared across Reframe crates.

use std::path::PathBuf;

/// Top-level error type for Reframe operations.
///
/// `NotReady`, `InvalidGeometry` and `EmptyTrack` are recovered locally by
/// the playback and render paths; only export and storage failures are meant
/// to reach the user.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    #[error("Video source not ready: {message}")]
    NotReady { message: String },

    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("Keyframe track is empty")]
    EmptyTrack,

    #[error("Persistence worker unavailable")]
    WorkerUnavailable,

    #[error("Recording session conflict: {message}")]
    SessionConflict { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReframeError.
pub type ReframeResult<T> = Result<T, ReframeError>;

impl ReframeError {
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady {
            message: msg.into(),
        }
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: msg.into(),
        }
    }

    pub fn session_conflict(msg: impl Into<String>) -> Self {
        Self::SessionConflict {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the render loop should skip this frame and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. } | Self::InvalidGeometry { .. } | Self::EmptyTrack
        )
    }
}
