//! Storage capability traits and their PostgreSQL implementations.

pub mod audit;
pub mod permission;
pub mod session;
pub mod user;

pub use audit::{AuditLogRepository, PgAuditLogRepository};
pub use permission::{PermissionRepository, PgPermissionRepository};
pub use session::{PgSessionRepository, SessionRepository};
pub use user::{PgUserRepository, UserRepository};

use adminhub_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning unique-constraint violations into `Conflict`.
pub(crate) fn map_write_error(err: sqlx::Error, context: &str, conflict: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::with_source(ErrorKind::Conflict, conflict, err)
        }
        _ => AppError::with_source(ErrorKind::Database, context, err),
    }
}
