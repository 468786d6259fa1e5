//! Custom error types for specboard.
//!
//! Queries across the engine boundary never fail: missing features come back
//! as `None` and unavailable git history as empty collections. These errors
//! are for the write paths (task creation, lane moves) and configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::board::{BoardFormat, Lane};
use crate::git::GitError;

/// Main error type for specboard operations
#[derive(Error, Debug)]
pub enum BoardError {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Feature directory could not be located
    #[error("Feature not found: {feature_id}")]
    FeatureNotFound { feature_id: String },

    /// Task could not be located on the feature's board
    #[error("Task {task_id} not found in feature {feature_id}")]
    TaskNotFound { feature_id: String, task_id: String },

    /// Identifier would escape the artifact tree or is otherwise unusable
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    // =========================================================================
    // Mutation Errors
    // =========================================================================
    /// Board format does not support the requested write
    #[error("Cannot {operation} on a {format} board")]
    UnsupportedMutation {
        operation: String,
        format: BoardFormat,
    },

    /// Target lane already holds a file for this task
    #[error("Task {task_id} already exists in {lane}")]
    LaneOccupied { task_id: String, lane: Lane },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Git error wrapper
    #[error(transparent)]
    Git(#[from] GitError),
}

impl BoardError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a feature-not-found error
    pub fn feature_not_found(feature_id: impl Into<String>) -> Self {
        Self::FeatureNotFound {
            feature_id: feature_id.into(),
        }
    }

    /// Create a task-not-found error
    pub fn task_not_found(feature_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            feature_id: feature_id.into(),
            task_id: task_id.into(),
        }
    }

    /// Create an invalid-identifier error
    pub fn invalid_identifier(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-mutation error
    pub fn unsupported(operation: impl Into<String>, format: BoardFormat) -> Self {
        Self::UnsupportedMutation {
            operation: operation.into(),
            format,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error means "nothing there" rather than "something broke".
    ///
    /// A rename that lost a race against another writer also counts.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FeatureNotFound { .. } | Self::TaskNotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidIdentifier { .. } => 3,
            Self::UnsupportedMutation { .. } | Self::LaneOccupied { .. } => 4,
            Self::Config { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for specboard results
pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BoardError::task_not_found("001-auth", "WP03");
        assert!(err.to_string().contains("WP03"));
        assert!(err.to_string().contains("001-auth"));
    }

    #[test]
    fn test_unsupported_display_names_format() {
        let err = BoardError::unsupported("move task", BoardFormat::LabeledSections);
        assert_eq!(
            err.to_string(),
            "Cannot move task on a labeled-sections board"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(BoardError::feature_not_found("x").is_not_found());
        assert!(BoardError::task_not_found("x", "T001").is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(BoardError::from(io).is_not_found());
        assert!(!BoardError::invalid_identifier("../x", "traversal").is_not_found());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BoardError::feature_not_found("x").exit_code(), 1);
        assert_eq!(BoardError::invalid_identifier("a", "b").exit_code(), 3);
        assert_eq!(
            BoardError::unsupported("move task", BoardFormat::Flat).exit_code(),
            4
        );
        let err = BoardError::config_with_path("bad json", PathBuf::from("x.json"));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/p/.spec-mix/config.json");
        let err = BoardError::config_with_path("failed to parse", path.clone());
        if let BoardError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: BoardError = io_err.into();
        assert!(matches!(err, BoardError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
