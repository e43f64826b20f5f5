//! Token signing and validation.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate keys.
//! Validation checks signature, issuer, audience, and expiry only; session
//! state is the caller's concern.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use adminhub_core::config::AuthConfig;
use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_entity::user::User;

use super::claims::{AccessClaims, RefreshClaims};

/// A signed access token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedAccess {
    pub token: String,
    pub claims: AccessClaims,
}

/// A signed refresh token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedRefresh {
    pub token: String,
    pub claims: RefreshClaims,
}

/// One signing key pair plus its validation rules.
#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl KeyPair {
    fn new(secret: &str, config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = config.leeway_seconds;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> AppResult<T> {
        decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::token_expired("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::token_invalid("Invalid token signature")
                }
                _ => AppError::token_invalid(format!("Token validation failed: {e}")),
            })
    }
}

/// Signs and validates access and refresh tokens.
///
/// Holds no storage handles; everything is a function of the keys and the
/// clock.
#[derive(Clone)]
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    /// Creates an issuer from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: KeyPair::new(&config.access_token_secret, config),
            refresh: KeyPair::new(&config.refresh_token_secret, config),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl_seconds: ttl_seconds(config.access_ttl_minutes, 60),
            refresh_ttl_seconds: ttl_seconds(config.refresh_ttl_days, 86_400),
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    /// Issues an access token for `user` carrying `permissions`.
    pub fn issue_access(
        &self,
        user: &User,
        permissions: &BTreeSet<String>,
    ) -> AppResult<IssuedAccess> {
        self.issue_access_at(user, permissions, Utc::now())
    }

    /// Issues an access token as if the current time were `now`.
    pub fn issue_access_at(
        &self,
        user: &User,
        permissions: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> AppResult<IssuedAccess> {
        let iat = now.timestamp();
        let claims = AccessClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            permissions: permissions.iter().cloned().collect(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat,
            exp: iat.saturating_add(self.access_ttl_seconds),
        };
        let token = self.access.sign(&claims)?;
        Ok(IssuedAccess { token, claims })
    }

    /// Issues a refresh token with a fresh random token ID.
    pub fn issue_refresh(&self, user_id: Uuid) -> AppResult<IssuedRefresh> {
        self.issue_refresh_at(user_id, Utc::now())
    }

    /// Issues a refresh token as if the current time were `now`.
    pub fn issue_refresh_at(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<IssuedRefresh> {
        let iat = now.timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            token_id: generate_token_id(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat,
            exp: iat.saturating_add(self.refresh_ttl_seconds),
        };
        let token = self.refresh.sign(&claims)?;
        Ok(IssuedRefresh { token, claims })
    }

    /// Validates an access token's signature and standard claims.
    pub fn validate_access(&self, token: &str) -> AppResult<AccessClaims> {
        self.access.verify(token)
    }

    /// Validates a refresh token's signature and standard claims.
    pub fn validate_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        self.refresh.verify(token)
    }
}

/// 128 random bits rendered as 32 lowercase hex characters.
/// Converts a configured lifetime to seconds, saturating instead of wrapping.
fn ttl_seconds(amount: u64, unit_seconds: u64) -> i64 {
    i64::try_from(amount.saturating_mul(unit_seconds)).unwrap_or(i64::MAX)
}

fn generate_token_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
