//! Asynchronous, append-only security audit trail.

pub mod trail;
pub mod worker;

pub use trail::AuditTrail;
pub use worker::AuditWorkerHandle;
