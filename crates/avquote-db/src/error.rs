//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (tree edit, restore)       │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ◄────────────────┘                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  API layer: is_not_found() → 404, Core(Validation) → 400, else → 500    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are passed up unchanged. Nothing here retries.

use avquote_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Loading a quote that does not exist (or was deleted)
    /// - Restoring into a deleted quote
    /// - Template or catalog id that doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two writers recording the same (quote_id, version)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored value could not be turned back into its domain type.
    ///
    /// ## When This Occurs
    /// - A decimal column holds text that is not a number
    /// - A template JSON column no longer matches its type
    #[error("Cannot decode {column}: {reason}")]
    Decode { column: String, reason: String },

    /// A domain value could not be serialized into its column.
    #[error("Cannot encode {column}: {reason}")]
    Encode { column: String, reason: String },

    /// Domain error raised while editing, restoring or validating.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Decode error for a stored column.
    pub fn decode(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Decode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an Encode error for a column being written.
    pub fn encode(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Encode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller should report a missing resource (quote, version,
    /// room, template, ...).
    pub fn is_not_found(&self) -> bool {
        match self {
            DbError::NotFound { .. } => true,
            DbError::Core(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::Decode
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => DbError::decode(index, source),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found_sees_through_core_errors() {
        assert!(DbError::not_found("Quote", "q-1").is_not_found());
        assert!(DbError::from(CoreError::VersionNotFound {
            quote_id: "q-1".to_string(),
            version: 4,
        })
        .is_not_found());
        assert!(!DbError::PoolExhausted.is_not_found());
        assert!(!DbError::from(ValidationError::Required {
            field: "name".to_string()
        })
        .is_not_found());
    }

    #[test]
    fn test_core_errors_keep_their_message() {
        let err = DbError::from(CoreError::VersionNotFound {
            quote_id: "q-1".to_string(),
            version: 4,
        });
        assert_eq!(err.to_string(), "Version 4 not found for quote q-1");
    }

    #[test]
    fn test_encode_and_decode_are_distinct() {
        let err = DbError::encode("templates.tax_json", "key must be a string");
        assert!(matches!(err, DbError::Encode { ref column, .. } if column == "templates.tax_json"));
        assert_eq!(
            err.to_string(),
            "Cannot encode templates.tax_json: key must be a string"
        );

        let err = DbError::decode("equipment.unit_cost", "invalid digit");
        assert_eq!(err.to_string(), "Cannot decode equipment.unit_cost: invalid digit");
    }
}
