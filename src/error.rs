//! Error types for docportal.

use thiserror::Error;

/// Common error type for docportal.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A folder or file with the same name already exists at the target location.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure or attempt to remove a protected member.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Operation precondition violated (non-empty delete, move into own subtree, ...).
    #[error("invalid state: {0}")]
    State(String),

    /// Physical filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant, except unique
    /// constraint violations which become [`PortalError::Conflict`].
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for PortalError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return PortalError::Conflict(db_err.message().to_string());
            }
        }
        PortalError::Database(e.to_string())
    }
}

/// Classification of an error as seen by callers of the core.
///
/// Every taxonomy member maps to its own class; anything internal is
/// reported as [`ErrorClass::Internal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    NotFound,
    Conflict,
    Forbidden,
    InvalidState,
    Storage,
    BadRequest,
    Internal,
}

impl PortalError {
    /// Get the caller-facing classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            PortalError::NotFound(_) => ErrorClass::NotFound,
            PortalError::Conflict(_) => ErrorClass::Conflict,
            PortalError::Permission(_) => ErrorClass::Forbidden,
            PortalError::State(_) => ErrorClass::InvalidState,
            PortalError::Io(_) => ErrorClass::Storage,
            PortalError::Validation(_) => ErrorClass::BadRequest,
            PortalError::Database(_) | PortalError::Config(_) => ErrorClass::Internal,
        }
    }

    /// Get a message that is safe to show to end users.
    ///
    /// Storage, database and configuration failures are reported generically.
    pub fn public_message(&self) -> String {
        match self {
            PortalError::Io(_) => "a storage error occurred".to_string(),
            PortalError::Database(_) | PortalError::Config(_) => {
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for docportal operations.
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = PortalError::NotFound("folder".to_string());
        assert_eq!(err.to_string(), "folder not found");
    }

    #[test]
    fn test_permission_error_display() {
        let err = PortalError::Permission("admin access required".to_string());
        assert_eq!(err.to_string(), "permission denied: admin access required");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PortalError = io_err.into();
        assert!(matches!(err, PortalError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_classes_are_distinct() {
        let errors = [
            PortalError::NotFound("x".into()),
            PortalError::Conflict("x".into()),
            PortalError::Permission("x".into()),
            PortalError::State("x".into()),
            PortalError::Io(std::io::Error::other("x")),
            PortalError::Validation("x".into()),
        ];
        let classes: std::collections::HashSet<ErrorClass> =
            errors.iter().map(|e| e.class()).collect();
        assert_eq!(classes.len(), errors.len());
        assert_eq!(
            PortalError::Database("x".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = PortalError::Database("no such table: folders".to_string());
        assert!(!err.public_message().contains("folders"));

        let err = PortalError::Io(std::io::Error::other("/srv/storage/secret"));
        assert!(!err.public_message().contains("/srv"));

        let err = PortalError::Conflict("folder '2024' already exists".to_string());
        assert!(err.public_message().contains("2024"));
    }

    #[test]
    fn test_error_class_serializes_screaming_case() {
        let json = serde_json::to_string(&ErrorClass::InvalidState).unwrap();
        assert_eq!(json, "\"INVALID_STATE\"");
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(PortalError::State("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
