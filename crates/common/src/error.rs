//! Error types shared across Montage crates.

use std::path::PathBuf;

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    /// A required input (file, selection, clip) was not provided.
    /// Surfaced to the user as an alert; never changes editor state.
    #[error("{message}")]
    MissingInput { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Job failed: {message}")]
    Job { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn job(msg: impl Into<String>) -> Self {
        Self::Job {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error should be shown to the user as an alert rather
    /// than only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::Export { .. } | Self::ExportInProgress
        )
    }
}
