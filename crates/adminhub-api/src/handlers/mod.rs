//! Route handlers organized by domain.

pub mod audit;
pub mod auth;
pub mod flow;
pub mod health;
