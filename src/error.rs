//! Error types and exit codes for wallmount

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for wallmount operations
#[derive(Error, Debug)]
pub enum WallmountError {
    /// A push command violates lock ownership (wrong id, or the slot is held by another id)
    #[error("Push conflict: {} requested while {}", .requested, reserved_description(.reserved))]
    Conflict {
        requested: String,
        reserved: Option<String>,
    },

    #[error("No staged content for version: {id}")]
    NotFound { id: String },

    #[error("Refusing to delete live version: {id}")]
    Forbidden { id: String },

    #[error("Invalid push command: {command}")]
    InvalidCommand { command: String },

    #[error("Invalid version identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("Live pointer unreadable at {}: {}", .path.display(), .message)]
    LivePointerUnreadable { path: PathBuf, message: String },

    #[error("Store at {} is owned by another wallmount process", .path.display())]
    StoreBusy { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn reserved_description(reserved: &Option<String>) -> String {
    match reserved {
        Some(id) => format!("{} holds the push slot", id),
        None => "no push is reserved".to_string(),
    }
}

impl WallmountError {
    pub fn invalid_identifier(value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the push protocol taxonomy (as opposed to
    /// an environmental failure such as IO or configuration).
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. }
                | Self::NotFound { .. }
                | Self::Forbidden { .. }
                | Self::InvalidCommand { .. }
                | Self::InvalidIdentifier { .. }
        )
    }

    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "CONFLICT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidCommand { .. } => "INVALID_COMMAND",
            Self::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Self::StoreBusy { .. } => "STORE_BUSY",
            Self::LivePointerUnreadable { .. } | Self::ConfigError { .. } | Self::Io(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::InvalidCommand { .. } | Self::InvalidIdentifier { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::StoreBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::LivePointerUnreadable { .. } | Self::ConfigError { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Convert error to the process exit code:
    /// - 0: Success
    /// - 1: IO / configuration error, store owned by another process
    /// - 2: Push protocol error
    /// - 3: Live pointer unreadable
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) | Self::ConfigError { .. } | Self::StoreBusy { .. } => ExitCode::from(1),
            Self::LivePointerUnreadable { .. } => ExitCode::from(3),
            _ => ExitCode::from(2),
        }
    }
}

/// Result type alias for wallmount operations
pub type Result<T> = std::result::Result<T, WallmountError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_conflict_message_names_holder() {
        let err = WallmountError::Conflict {
            requested: "v2".into(),
            reserved: Some("v1".into()),
        };
        assert_eq!(
            err.to_string(),
            "Push conflict: v2 requested while v1 holds the push slot"
        );

        let idle = WallmountError::Conflict {
            requested: "v2".into(),
            reserved: None,
        };
        assert!(idle.to_string().contains("no push is reserved"));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                WallmountError::Conflict {
                    requested: "a".into(),
                    reserved: None,
                },
                StatusCode::CONFLICT,
            ),
            (
                WallmountError::NotFound { id: "a".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                WallmountError::Forbidden { id: "a".into() },
                StatusCode::FORBIDDEN,
            ),
            (
                WallmountError::InvalidCommand {
                    command: "PAUSE".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                WallmountError::invalid_identifier("../x", "path separator"),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
            assert!(err.is_protocol_error());
        }
    }

    #[test]
    fn test_internal_errors_are_not_protocol_errors() {
        let err = WallmountError::ConfigError {
            message: "bad".into(),
        };
        assert!(!err.is_protocol_error());
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_busy_is_environmental() {
        let err = WallmountError::StoreBusy {
            path: PathBuf::from("/srv/wall/.wallmount.lock"),
        };
        assert!(!err.is_protocol_error());
        assert_eq!(err.code(), "STORE_BUSY");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("/srv/wall/.wallmount.lock"));
    }
}
