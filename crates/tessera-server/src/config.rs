//! Server settings loaded from `TESSERA_*` environment variables.
//!
//! Call `dotenvy::dotenv()` before [`Settings::from_env`] to pick up a
//! local `.env` file. Settings are read once at startup and never again.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use tessera_auth::{AuthConfig, MAX_SESSION_TTL_SECS};
use tessera_db::DbConfig;
use thiserror::Error;

const PREFIX: &str = "TESSERA_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Deployment environment. Only `Prod` marks cookies `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        })
    }
}

/// Immutable server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_name: String,
    pub version: String,
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: "tessera".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            environment: Environment::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db: DbConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup. Unset keys keep
    /// their defaults; set keys that fail to parse are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{PREFIX}{name}"));
        let mut settings = Self::default();

        if let Some(v) = get("SERVICE_NAME") {
            settings.service_name = v;
        }
        if let Some(v) = get("VERSION") {
            settings.version = v;
        }
        if let Some(v) = get("ENVIRONMENT") {
            settings.environment = parse("ENVIRONMENT", v)?;
        }
        if let Some(v) = get("BIND_ADDR") {
            settings.bind_addr = parse("BIND_ADDR", v)?;
        }
        if let Some(v) = get("DB_URL") {
            settings.db.url = v;
        }
        if let Some(v) = get("DB_NAMESPACE") {
            settings.db.namespace = v;
        }
        if let Some(v) = get("DB_DATABASE") {
            settings.db.database = v;
        }
        if let Some(v) = get("DB_USER") {
            settings.db.username = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            settings.db.password = v;
        }
        if let Some(v) = get("SESSION_TTL_SECS") {
            let ttl: u64 = parse("SESSION_TTL_SECS", v.clone())?;
            if ttl == 0 || ttl > MAX_SESSION_TTL_SECS {
                return Err(invalid(
                    "SESSION_TTL_SECS",
                    v,
                    format!("must be between 1 and {MAX_SESSION_TTL_SECS}"),
                ));
            }
            settings.auth.session_ttl_secs = ttl;
        }

        Ok(settings)
    }

    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Prod
    }
}

fn parse<T>(name: &str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(name, value.clone(), e.to_string()))
}

fn invalid(name: &str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: format!("{PREFIX}{name}"),
        value,
        reason: reason.into(),
    }
}
