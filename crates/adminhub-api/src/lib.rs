//! # adminhub-api
//!
//! HTTP surface for AdminHub built on Axum. Exposes the login, refresh,
//! logout, and logout-all flows, keeps the refresh token in an HttpOnly
//! cookie, and maps [`adminhub_core::AppError`] onto status codes.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
