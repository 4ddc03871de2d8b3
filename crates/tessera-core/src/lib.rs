//! Tessera Core — domain entities, repository contracts and the
//! in-memory storage adapter.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{CoreError, CoreResult};
pub use models::session::Session;
pub use models::user::{User, normalize_email};
pub use repository::{AuthRepository, AuthStore, UnitOfWork};
