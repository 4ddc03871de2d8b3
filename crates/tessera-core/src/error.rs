//! Storage-level error types shared by every repository adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// A guarded write found the row already changed by another unit.
    #[error("Entity changed concurrently: {entity}")]
    StaleWrite { entity: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl CoreError {
    /// True when the error is a uniqueness violation on the given entity.
    pub fn is_conflict_on(&self, entity: &str) -> bool {
        matches!(self, CoreError::AlreadyExists { entity: e } if e == entity)
    }

    /// True when a guarded write on the given entity lost a race.
    pub fn is_stale_on(&self, entity: &str) -> bool {
        matches!(self, CoreError::StaleWrite { entity: e } if e == entity)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_matches_entity() {
        let err = CoreError::AlreadyExists {
            entity: "user".into(),
        };
        assert!(err.is_conflict_on("user"));
        assert!(!err.is_conflict_on("session"));
    }

    #[test]
    fn stale_write_matches_entity() {
        let err = CoreError::StaleWrite {
            entity: "session".into(),
        };
        assert!(err.is_stale_on("session"));
        assert!(!err.is_conflict_on("session"));
    }

    #[test]
    fn database_error_is_not_conflict() {
        assert!(!CoreError::Database("boom".into()).is_conflict_on("user"));
    }
}
