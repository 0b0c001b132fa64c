//! Error types shared across Clipforge crates.

use std::path::PathBuf;

/// Message shown to the user whenever an export fails for a resource reason.
pub const EXPORT_FAILED_MESSAGE: &str = "Export failed. Please try again.";

/// Top-level error type for Clipforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    /// An edit the user asked for cannot be applied in the current state.
    #[error("{message}")]
    InvalidOperation { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

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
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

impl ClipforgeError {
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error was caused by an invalid user edit rather than a
    /// failing resource.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }

    /// The single string surfaced to the user.
    ///
    /// Invalid edits carry their own message; every resource failure
    /// collapses into a generic export failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidOperation { message } => message.clone(),
            _ => EXPORT_FAILED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_operation_keeps_message() {
        let err = ClipforgeError::invalid_operation("Cannot delete the only clip");
        assert!(err.is_invalid_operation());
        assert_eq!(err.user_message(), "Cannot delete the only clip");
        assert_eq!(err.to_string(), "Cannot delete the only clip");
    }

    #[test]
    fn test_resource_errors_use_generic_message() {
        let err = ClipforgeError::encode("ffmpeg exited with status 1");
        assert!(!err.is_invalid_operation());
        assert_eq!(err.user_message(), EXPORT_FAILED_MESSAGE);
    }
}
