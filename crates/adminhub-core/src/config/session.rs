//! Refresh-token cookie configuration.

use serde::{Deserialize, Serialize};

/// How the refresh token travels between server and browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the HttpOnly cookie carrying the refresh token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Path scope of the cookie.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    /// Whether the cookie carries the `Secure` attribute.
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_path: default_cookie_path(),
            cookie_secure: true,
        }
    }
}

fn default_cookie_name() -> String {
    "refresh_token".to_string()
}

fn default_cookie_path() -> String {
    "/auth".to_string()
}

fn default_true() -> bool {
    true
}
