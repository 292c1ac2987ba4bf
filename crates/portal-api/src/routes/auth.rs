//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portal_store::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::session::{clear_cookie, session_cookie, ClientSession};
use crate::state::PortalState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
}

/// Client details shown in the portal header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub has_orders: bool,
}

impl From<&Client> for ClientProfile {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            email: client.email.clone(),
            name: client.name.clone(),
            company: client.company.clone(),
            has_orders: client.crm_id.is_some(),
        }
    }
}

pub(crate) async fn login(
    State(state): State<Arc<PortalState>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = request.email.trim();
    if email.is_empty() {
        state.metrics().login("invalid");
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "email is required"));
    }

    let client = state.store().find_client_by_email(email)?;
    let Some(client) = client else {
        state.metrics().login("unknown");
        info!("login attempt for unknown or inactive email");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "unknown email address"));
    };

    state.metrics().login("success");
    info!(client = client.id, "client signed in");
    let cookie = session_cookie(&state.config().session, &client.email);
    Ok(([(SET_COOKIE, cookie)], Json(ClientProfile::from(&client))))
}

pub(crate) async fn logout(State(state): State<Arc<PortalState>>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_cookie(&state.config().session))],
    )
}

pub(crate) async fn me(session: ClientSession) -> Json<ClientProfile> {
    Json(ClientProfile::from(&session.client))
}
