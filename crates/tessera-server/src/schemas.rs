//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::User;
use uuid::Uuid;

use crate::problem::Problem;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthEmailIn {
    pub email: String,
}

impl AuthEmailIn {
    /// Format check only. Normalization and uniqueness are left to the
    /// auth service.
    pub fn validate(&self) -> Result<(), Problem> {
        validate_email(self.email.trim()).map_err(Problem::invalid_email)
    }
}

fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Email is required.");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Email must not contain whitespace.");
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Email must contain an @.");
    };
    if local.is_empty() || domain.contains('@') {
        return Err("Email must have exactly one @ and a local part.");
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err("Email domain must be a dotted name.");
    }
    Ok(())
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        for email in ["a@b.co", "New@Example.com", "  padded@example.org  ", "x.y+z@mail.example.io"] {
            let body = AuthEmailIn { email: email.into() };
            assert!(body.validate().is_ok(), "{email} should be accepted");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in ["", "   ", "plain", "@example.com", "a@b@c.com", "a@localhost", "a@.com", "a@b.", "a b@c.com"] {
            let body = AuthEmailIn { email: email.into() };
            let problem = body.validate().unwrap_err();
            assert_eq!(problem.status, 422, "{email:?} should be rejected");
        }
    }

    #[test]
    fn summary_keeps_missing_last_login_as_null() {
        let user = User::new("a@b.co".into(), Utc::now());
        let json = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert!(json.get("last_login_at").is_some_and(|v| v.is_null()));
        assert_eq!(json["is_active"], true);
    }
}
