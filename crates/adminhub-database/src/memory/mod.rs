//! In-memory storage engines.
//!
//! Single-process implementations of every repository trait. They enforce
//! the same uniqueness and conditional-revoke rules as the PostgreSQL
//! schema, which makes them suitable for tests and embedded use.

pub mod audit;
pub mod permission;
pub mod session;
pub mod user;

pub use audit::MemoryAuditLogRepository;
pub use permission::MemoryPermissionRepository;
pub use session::MemorySessionRepository;
pub use user::MemoryUserRepository;
