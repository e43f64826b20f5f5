//! Security audit trail entities.

pub mod model;

pub use model::{AuditLogEntry, AuditQuery, actions, resources};
