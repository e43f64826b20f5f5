//! Token signing and credential configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest accepted access-token lifetime (one day).
const MAX_ACCESS_TTL_MINUTES: u64 = 24 * 60;
/// Longest accepted refresh-token lifetime (one year).
const MAX_REFRESH_TTL_DAYS: u64 = 365;

/// Authentication and token configuration.
///
/// Access and refresh tokens are signed with separate HMAC-SHA256 keys so
/// that leaking one key never allows forging the other kind of token.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for access-token signing.
    #[serde(default = "default_access_secret")]
    pub access_token_secret: String,
    /// Secret key for refresh-token signing. Must differ from the access key.
    #[serde(default = "default_refresh_secret")]
    pub refresh_token_secret: String,
    /// `iss` claim written into and required on every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// `aud` claim written into and required on every token.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token TTL in minutes. Also the upper bound on permission staleness.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Clock-skew leeway applied when validating `exp`, in seconds.
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Rejects key material that would break the access/refresh separation.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.access_token_secret.is_empty() || self.refresh_token_secret.is_empty() {
            return Err(AppError::configuration("Token signing secrets must not be empty"));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(AppError::configuration(
                "Access and refresh tokens must be signed with different secrets",
            ));
        }
        if self.access_ttl_minutes == 0 || self.refresh_ttl_days == 0 {
            return Err(AppError::configuration("Token TTLs must be positive"));
        }
        if self.access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            return Err(AppError::configuration(format!(
                "access_ttl_minutes must not exceed {MAX_ACCESS_TTL_MINUTES}"
            )));
        }
        if self.refresh_ttl_days > MAX_REFRESH_TTL_DAYS {
            return Err(AppError::configuration(format!(
                "refresh_ttl_days must not exceed {MAX_REFRESH_TTL_DAYS}"
            )));
        }
        Ok(())
    }

    /// Whether either secret is still the shipped development default.
    pub fn uses_default_secrets(&self) -> bool {
        self.access_token_secret == default_access_secret()
            || self.refresh_token_secret == default_refresh_secret()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: default_access_secret(),
            refresh_token_secret: default_refresh_secret(),
            issuer: default_issuer(),
            audience: default_audience(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            leeway_seconds: 0,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

fn default_access_secret() -> String {
    "CHANGE_ME_ACCESS_TOKEN_SECRET".to_string()
}

fn default_refresh_secret() -> String {
    "CHANGE_ME_REFRESH_TOKEN_SECRET".to_string()
}

fn default_issuer() -> String {
    "adminhub".to_string()
}

fn default_audience() -> String {
    "adminhub-api".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    7
}
