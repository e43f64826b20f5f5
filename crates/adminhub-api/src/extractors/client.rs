//! Client address and user agent, recorded on audit entries.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;

use adminhub_auth::ClientContext;

use crate::state::AppState;

const MAX_USER_AGENT_LEN: usize = 512;

/// Best-effort client details. Never rejects a request.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub ClientContext);

impl ClientInfo {
    /// Reads the client address and user agent.
    ///
    /// `x-forwarded-for` (first hop) and `x-real-ip` are honored only when
    /// `trust_forwarded` is set. Otherwise the address is the TCP peer, if
    /// the server recorded one.
    pub fn from_parts(parts: &Parts, trust_forwarded: bool) -> Self {
        let forwarded = if trust_forwarded {
            forwarded_ip(&parts.headers)
        } else {
            None
        };
        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.chars().take(MAX_USER_AGENT_LEN).collect());

        Self(ClientContext {
            ip_address,
            user_agent,
        })
    }

    /// Consumes the extractor.
    pub fn into_inner(self) -> ClientContext {
        self.0
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(
            parts,
            state.config.server.trust_forwarded_headers,
        ))
    }
}
