//! Signed access and refresh tokens.

pub mod claims;
pub mod issuer;

pub use claims::{AccessClaims, RefreshClaims};
pub use issuer::{IssuedAccess, IssuedRefresh, TokenIssuer};
