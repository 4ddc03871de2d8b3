//! Database-specific error types and conversions.

use tessera_core::error::CoreError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Unique index {index} violated on {entity}")]
    UniqueViolation { entity: String, index: String },

    #[error("Guarded write on {entity} matched no row")]
    StaleWrite { entity: String },

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { entity, .. } => CoreError::AlreadyExists { entity },
            DbError::StaleWrite { entity } => CoreError::StaleWrite { entity },
            other => CoreError::Database(other.to_string()),
        }
    }
}
