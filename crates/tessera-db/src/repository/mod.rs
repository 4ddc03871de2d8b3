//! SurrealDB repository implementations.

mod auth;

pub use auth::{SurrealAuthStore, SurrealUnitOfWork};
