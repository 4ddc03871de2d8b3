//! Tessera Auth — email-only registration and login, opaque session
//! tokens, logout and session-to-user resolution.

pub mod clock;
pub mod config;
pub mod error;
pub mod service;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, MAX_SESSION_TTL_SECS};
pub use error::{AuthError, AuthResult};
pub use service::{AuthService, SessionGrant};
