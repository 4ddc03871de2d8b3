//! Tessera Database — SurrealDB connection management, schema
//! migrations and the production [`AuthStore`] adapter.
//!
//! [`AuthStore`]: tessera_core::repository::AuthStore

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{SurrealAuthStore, SurrealUnitOfWork};
pub use schema::run_migrations;
