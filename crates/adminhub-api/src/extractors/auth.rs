//! `AuthUser` extractor: pulls the access token from the Authorization
//! header and validates it.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use adminhub_auth::AccessClaims;
use adminhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims of an authenticated caller.
///
/// Access tokens are self-contained: no session lookup happens here, so a
/// revoked session keeps its access token usable until it expires.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

impl AuthUser {
    /// Returns the inner claims.
    pub fn claims(&self) -> &AccessClaims {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = AccessClaims;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::token_invalid("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::token_invalid("Invalid Authorization header format"))?;

        let claims = state.auth.issuer().validate_access(token.trim())?;
        Ok(AuthUser(claims))
    }
}
