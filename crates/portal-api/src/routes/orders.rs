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
use axum::Json;
use portal_crm::Order;
use tracing::warn;

use crate::error::ApiError;
use crate::session::ClientSession;
use crate::state::PortalState;

pub(crate) async fn list(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Some(crm_id) = session
        .client
        .crm_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return Ok(Json(Vec::new()));
    };

    let crm = state.crm();
    if !crm.is_enabled() {
        return Ok(Json(Vec::new()));
    }
    match crm.orders_for(crm_id).await {
        Ok(orders) => {
            state.metrics().crm_request("orders", "success");
            Ok(Json(orders))
        }
        Err(err) => {
            state.metrics().crm_request("orders", "error");
            warn!(client = session.client.id, error = %err, "crm order lookup failed");
            Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "order information is temporarily unavailable",
            ))
        }
    }
}
