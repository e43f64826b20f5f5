//! HTTP server configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Deadline for a single login/refresh/logout flow, in seconds.
    ///
    /// When it elapses the flow's cancellation signal fires.
    #[serde(default = "default_flow_timeout")]
    pub flow_timeout_seconds: u64,
    /// Take the client address from `x-forwarded-for` / `x-real-ip`.
    ///
    /// Enable only behind a reverse proxy that overwrites these headers;
    /// otherwise clients can write any address into the audit trail.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl ServerConfig {
    /// Returns the `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_seconds: default_shutdown_grace(),
            flow_timeout_seconds: default_flow_timeout(),
            trust_forwarded_headers: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_flow_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_headers_untrusted_by_default() {
        assert!(!ServerConfig::default().trust_forwarded_headers);
    }
}
