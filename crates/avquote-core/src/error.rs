//! # Error Types
//!
//! Domain-specific error types for avquote-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  avquote-core errors (this file)                                       │
//! │  ├── CoreError        - Tree edits, versions, snapshots                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  avquote-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures (wraps CoreError)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller (404 / 400 / 500)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Division by zero in margin percentages is not an error; it yields zero.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node referenced by id does not exist in the quote tree.
    ///
    /// ## When This Occurs
    /// - Adding a system to a room id that is not part of this quote
    /// - Updating or removing a line item that was already removed
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested version number is absent from the quote's history.
    ///
    /// Callers translate this into a user-facing 404.
    #[error("Version {version} not found for quote {quote_id}")]
    VersionNotFound { quote_id: String, version: i64 },

    /// A snapshot belongs to another quote than the one being restored.
    #[error("Snapshot of quote {snapshot_quote_id} cannot be restored into quote {quote_id}")]
    SnapshotQuoteMismatch {
        quote_id: String,
        snapshot_quote_id: String,
    },

    /// The snapshot payload is tagged with a schema this build cannot read.
    #[error("Unsupported snapshot schema version: {0}")]
    UnsupportedSnapshotSchema(u32),

    /// The snapshot payload is not valid JSON for its declared schema.
    #[error("Snapshot payload is malformed: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether the caller should report this as a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound { .. } | CoreError::VersionNotFound { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements: catalog imports,
/// status strings, template definitions.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparsable number, unknown status).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A computed figure does not fit in a decimal.
    ///
    /// Reported instead of panicking when quantities, rates and prices multiply
    /// past the representable range.
    #[error("{field} is too large to calculate")]
    TooLarge { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::VersionNotFound {
            quote_id: "q-1".to_string(),
            version: 7,
        };
        assert_eq!(err.to_string(), "Version 7 not found for quote q-1");

        let err = CoreError::not_found("Room", "r-9");
        assert_eq!(err.to_string(), "Room not found: r-9");
    }

    #[test]
    fn test_is_not_found() {
        assert!(CoreError::not_found("System", "s").is_not_found());
        assert!(CoreError::VersionNotFound {
            quote_id: "q".to_string(),
            version: 1
        }
        .is_not_found());
        assert!(!CoreError::UnsupportedSnapshotSchema(9).is_not_found());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
