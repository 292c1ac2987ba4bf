//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Session cookie: the base64-encoded login email, nothing more.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use portal_common::SessionConfig;
use portal_store::Client;
use tracing::debug;

use crate::error::ApiError;
use crate::state::PortalState;

/// `Set-Cookie` value that signs `email` in.
pub fn session_cookie(config: &SessionConfig, email: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        config.cookie_name,
        STANDARD.encode(email.trim())
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session.
pub fn clear_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Email carried by the session cookie, if present and decodable.
pub fn session_email(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"'))?;
    let bytes = STANDARD.decode(raw).ok()?;
    let email = String::from_utf8(bytes).ok()?;
    let email = email.trim();
    (!email.is_empty()).then(|| email.to_owned())
}

/// The signed-in client. Rejects with 401 when the cookie is missing,
/// undecodable, or names an unknown or inactive client.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub client: Client,
}

#[async_trait]
impl FromRequestParts<Arc<PortalState>> for ClientSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<PortalState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(email) = session_email(&parts.headers, &state.config().session.cookie_name)
        else {
            return Err(ApiError::unauthorized());
        };
        let client = state.store().find_client_by_email(&email)?;
        match client {
            Some(client) => Ok(Self { client }),
            None => {
                debug!("session cookie names no active client");
                Err(ApiError::unauthorized())
            }
        }
    }
}
