//! Error types for the container catalog
//!
//! Every user-facing failure carries an HTTP-style status code plus a
//! human-readable message, surfaced to callers as `{error_code, msg}`.

use serde_json::json;
use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, MetaDbError>;

/// Catalog error taxonomy
#[derive(Debug, Error)]
pub enum MetaDbError {
    /// Declared schema version below the minimum the server supports (400)
    #[error(
        "You tried to upload a dataset complying with model version {declared} \
         but the server requires a minimum model version of {minimum}"
    )]
    VersionTooOld { declared: String, minimum: String },

    /// Required field absent from a metadata section (400)
    #[error("Attribute '{field}' required in {section}.json")]
    MissingField { field: String, section: String },

    /// A field value could not be coerced to its declared type (400)
    #[error("Failed to convert '{value}' for attribute '{field}': {detail}")]
    InvalidFieldValue {
        field: String,
        value: String,
        detail: String,
    },

    /// Container is a recognized format but structurally unreadable (400)
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Sniffed content type is neither supported format (415)
    #[error("File format has to be hdf5 or zip, got {0}")]
    UnsupportedMediaType(String),

    /// Recognized but not-yet-implemented container format (501)
    #[error("The server does not support parsing {0} files yet")]
    UnsupportedFormat(String),

    /// Backing-store constraint violation during save (400)
    #[error("IntegrityError: {0}")]
    Integrity(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else, wrapped with a diagnostic for operators (500)
    #[error("Unknown error! Please report to your administrator providing this information: {0}")]
    Internal(String),
}

impl MetaDbError {
    /// HTTP-style status code for this error
    pub fn error_code(&self) -> u16 {
        match self {
            MetaDbError::VersionTooOld { .. }
            | MetaDbError::MissingField { .. }
            | MetaDbError::InvalidFieldValue { .. }
            | MetaDbError::MalformedContainer(_)
            | MetaDbError::Integrity(_) => 400,
            MetaDbError::UnsupportedMediaType(_) => 415,
            MetaDbError::UnsupportedFormat(_) => 501,
            MetaDbError::Database(e) => {
                if is_integrity_violation(e) {
                    400
                } else {
                    500
                }
            }
            MetaDbError::Io(_) | MetaDbError::Config(_) | MetaDbError::Internal(_) => 500,
        }
    }

    /// Fold store-level errors into the caller-facing taxonomy: constraint
    /// violations become [`MetaDbError::Integrity`], anything else from the
    /// store becomes [`MetaDbError::Internal`]. Domain errors pass through
    /// unchanged.
    pub fn into_taxonomy(self) -> Self {
        match self {
            MetaDbError::Database(e) if is_integrity_violation(&e) => {
                MetaDbError::Integrity(e.to_string())
            }
            MetaDbError::Database(e) => MetaDbError::Internal(e.to_string()),
            MetaDbError::Io(e) => MetaDbError::Internal(e.to_string()),
            other => other,
        }
    }

    /// Structured payload handed to the caller
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "error_code": self.error_code(),
            "msg": self.to_string(),
        })
    }
}

/// Whether a sqlx error is a store-level constraint violation
fn is_integrity_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            use sqlx::error::ErrorKind;
            matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            )
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_code_and_message() {
        let err = MetaDbError::MissingField {
            field: "uuid".to_string(),
            section: "content".to_string(),
        };
        let payload = err.payload();
        assert_eq!(payload["error_code"], 400);
        assert_eq!(payload["msg"], "Attribute 'uuid' required in content.json");
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            MetaDbError::UnsupportedMediaType("text/plain".to_string()).error_code(),
            415
        );
        assert_eq!(
            MetaDbError::UnsupportedFormat("hdf5".to_string()).error_code(),
            501
        );
        assert_eq!(MetaDbError::Internal("boom".to_string()).error_code(), 500);
        assert_eq!(
            MetaDbError::VersionTooOld {
                declared: "0.1".to_string(),
                minimum: "0.3".to_string()
            }
            .error_code(),
            400
        );
    }
}
