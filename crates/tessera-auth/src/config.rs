//! Authentication configuration.

use chrono::Duration;

/// Session lifetime used when nothing else is configured: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest session lifetime honored: 365 days.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 604_800 = 7 days). Values
    /// above [`MAX_SESSION_TTL_SECS`] are capped.
    pub session_ttl_secs: u64,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS);
        // Capped well inside i64 range.
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_seven_days() {
        assert_eq!(AuthConfig::default().session_ttl(), Duration::days(7));
    }

    #[test]
    fn oversized_ttl_is_capped() {
        for secs in [u64::MAX, 10_000_000_000_000, MAX_SESSION_TTL_SECS + 1] {
            let config = AuthConfig {
                session_ttl_secs: secs,
            };
            assert_eq!(config.session_ttl(), Duration::days(365));
        }
    }
}
