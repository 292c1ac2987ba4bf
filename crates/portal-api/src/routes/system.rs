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
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::PortalState;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub git_commit: String,
    pub profile: String,
    pub uptime_seconds: u64,
    /// `ok` or `unreachable`.
    pub database: String,
    pub crm_enabled: bool,
    pub pdf_enabled: bool,
}

pub(crate) async fn status(State(state): State<Arc<PortalState>>) -> Json<StatusResponse> {
    let database = match state.store().ping() {
        Ok(()) => "ok",
        Err(err) => {
            warn!(error = %err, "database ping failed");
            "unreachable"
        }
    };
    let version = state.version();
    Json(StatusResponse {
        version: version.cli_string(),
        git_commit: version.git_sha.clone(),
        profile: version.profile.clone(),
        uptime_seconds: state.uptime_seconds(),
        database: database.to_owned(),
        crm_enabled: state.crm().is_enabled(),
        pdf_enabled: state.pdf().is_some(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<PortalState>>) -> Response {
    let families = state.metrics().registry().gather();
    match TextEncoder::new().encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
