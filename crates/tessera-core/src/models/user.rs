//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account, identified by its normalized email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) address; unique across all users.
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Updated on every successful login, registration included.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Deactivated users cannot authenticate.
    pub is_active: bool,
}

impl User {
    /// Build a fresh active user. `email` must already be normalized.
    pub fn new(email: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: now,
            last_login_at: None,
            is_active: true,
        }
    }
}

/// Canonicalize an email address for storage and lookup.
///
/// Trims surrounding whitespace and lowercases. No format validation is
/// performed here.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
