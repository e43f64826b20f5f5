//! # adminhub-entity
//!
//! Domain entity models for the AdminHub authentication core. Every struct
//! in this crate represents a database table row or a domain value object.
//! Database rows additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod role;
pub mod session;
pub mod user;
