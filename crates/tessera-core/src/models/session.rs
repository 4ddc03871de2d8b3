//! Session domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bearer session owned by one user.
///
/// Only the hash of the token is kept. Sessions are never deleted; logout
/// sets `revoked_at` once and the record stays for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation; there is no sliding expiry.
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `expires_at` saturates at the latest representable instant.
    pub fn new(user_id: Uuid, token_hash: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            created_at: now,
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// A session expires at the instant `expires_at` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".into(),
            created_at: expires_at - Duration::days(7),
            expires_at,
            revoked_at: None,
        }
    }

    #[test]
    fn expires_exactly_at_boundary() {
        let session = session_expiring_at(t0());
        assert!(session.is_expired_at(t0()));
        assert!(!session.is_valid_at(t0()));
    }

    #[test]
    fn valid_one_second_before_expiry() {
        let session = session_expiring_at(t0() + Duration::seconds(1));
        assert!(session.is_valid_at(t0()));
    }

    #[test]
    fn revoked_session_is_never_valid() {
        let mut session = session_expiring_at(t0() + Duration::days(1));
        session.revoked_at = Some(t0());
        assert!(!session.is_valid_at(t0()));
    }

    #[test]
    fn new_session_expires_after_ttl() {
        let session = Session::new(Uuid::new_v4(), "h".into(), t0(), Duration::days(7));
        assert_eq!(session.expires_at, t0() + Duration::days(7));
        assert_eq!(session.created_at, t0());
        assert!(session.revoked_at.is_none());
    }

    #[test]
    fn expiry_saturates_instead_of_overflowing() {
        let near_end = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let session = Session::new(Uuid::new_v4(), "h".into(), near_end, Duration::days(7));
        assert_eq!(session.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(session.expires_at > session.created_at);
    }
}
