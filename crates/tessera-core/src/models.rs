//! Domain models for tessera.
//!
//! Plain records shared by the auth service and every storage adapter.

pub mod session;
pub mod user;
