//! Refresh-token session records.

pub mod model;

pub use model::{NewSession, Session};
