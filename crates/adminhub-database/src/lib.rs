//! # adminhub-database
//!
//! Storage capability traits for the authentication core, with a
//! PostgreSQL engine for production and an in-memory engine for tests and
//! embedding. Both engines enforce the same uniqueness and conditional
//! update rules, so higher layers never depend on which one is in use.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::{DatabasePool, PgRepositories};
pub use repositories::{
    AuditLogRepository, PermissionRepository, SessionRepository, UserRepository,
};
