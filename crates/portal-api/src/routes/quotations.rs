//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use portal_crm::QuoteResponseEvent;
use portal_docs::{pdf_file_name, render_quotation_html};
use portal_pricing::{Amount, PricedQuotation};
use portal_store::{
    Client, EntityKind, PortalStore, Project, Quotation, QuotationStatus, QuoteDecision,
    QuoteResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::quote::{client_quotation, parent_project, price_quotation, quotation_view};
use crate::session::ClientSession;
use crate::state::PortalState;

#[derive(Debug, Serialize)]
pub struct QuotationSummary {
    pub id: i64,
    pub reference: String,
    pub project_id: Option<i64>,
    pub project_title: Option<String>,
    /// Status as of today; sent quotations past their date read as expired.
    pub status: QuotationStatus,
    pub valid_until: Option<NaiveDate>,
    /// Absent when the quotation cannot be priced.
    pub net_total: Option<Amount>,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub summary: QuotationSummary,
    pub intro: Option<String>,
    pub notes: Option<String>,
    pub responded_at: Option<String>,
    pub can_respond: bool,
    pub pricing: PricedQuotation,
    pub responses: Vec<QuoteResponse>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub decision: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RespondResponse {
    pub status: String,
    pub forwarded: bool,
}

fn missing(id: i64) -> ApiError {
    ApiError::not_found(format!("quotation {id}"))
}

pub(crate) fn summarize(
    state: &PortalState,
    store: &PortalStore,
    quotation: &Quotation,
    project_title: Option<&str>,
    today: NaiveDate,
) -> QuotationSummary {
    let net_total = match price_quotation(store, quotation, &state.config().pricing.default_vat_rate)
    {
        Ok(priced) => Some(priced.net_total),
        Err(err) => {
            warn!(quotation = quotation.id, error = %err, "quotation cannot be priced");
            None
        }
    };
    QuotationSummary {
        id: quotation.id,
        reference: quotation.reference.clone(),
        project_id: quotation.project_id,
        project_title: project_title.map(str::to_owned),
        status: quotation.effective_status(today),
        valid_until: quotation.valid_until,
        net_total,
        currency: state.config().pricing.currency.clone(),
    }
}

pub(crate) async fn list(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
) -> Result<Json<Vec<QuotationSummary>>, ApiError> {
    let client = session.client.id;
    let store = state.store();
    let titles = store
        .list_entities(EntityKind::Project, client)?
        .iter()
        .map(|record| Project::from_record(record).map(|project| (project.id, project.title)))
        .collect::<Result<HashMap<_, _>, _>>()?;

    let today = state.today();
    let summaries = store
        .list_entities(EntityKind::Quotation, client)?
        .iter()
        .map(|record| {
            let quotation = Quotation::from_record(record)?;
            let title = quotation
                .project_id
                .and_then(|project| titles.get(&project))
                .map(String::as_str);
            Ok(summarize(&state, &store, &quotation, title, today))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(Json(summaries))
}

pub(crate) async fn detail(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
    Path(id): Path<i64>,
) -> Result<Json<QuotationDetail>, ApiError> {
    let store = state.store();
    let quotation = client_quotation(&store, &session.client, id)?.ok_or_else(|| missing(id))?;
    let pricing = price_quotation(&store, &quotation, &state.config().pricing.default_vat_rate)?;
    let project = parent_project(&store, &quotation)?;
    let responses = store.quote_responses(quotation.id)?;

    let today = state.today();
    let status = quotation.effective_status(today);
    let summary = QuotationSummary {
        id: quotation.id,
        reference: quotation.reference.clone(),
        project_id: quotation.project_id,
        project_title: project.map(|project| project.title),
        status,
        valid_until: quotation.valid_until,
        net_total: Some(pricing.net_total),
        currency: state.config().pricing.currency.clone(),
    };
    Ok(Json(QuotationDetail {
        summary,
        intro: quotation.intro,
        notes: quotation.notes,
        responded_at: quotation.responded_at,
        can_respond: status == QuotationStatus::Sent,
        pricing,
        responses,
    }))
}

pub(crate) async fn respond(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<RespondRequest>,
) -> Result<Json<RespondResponse>, ApiError> {
    let decision: QuoteDecision = request
        .decision
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "decision must be 'accept' or 'reject'",
            )
        })?;

    let today = state.today();
    let (response, event) = {
        let mut store = state.store();
        let quotation =
            client_quotation(&store, &session.client, id)?.ok_or_else(|| missing(id))?;
        let status = quotation.effective_status(today);
        if status != QuotationStatus::Sent {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                format!(
                    "quotation {} is {}; only sent quotations can be answered",
                    quotation.reference,
                    status.as_str()
                ),
            ));
        }
        let response = store.record_quote_response(
            quotation.id,
            session.client.id,
            decision,
            request.comment.as_deref(),
            Utc::now(),
        )?;
        let event = QuoteResponseEvent {
            quotation_id: quotation.id,
            reference: quotation.reference.clone(),
            client_email: session.client.email.clone(),
            crm_client_id: session.client.crm_id.clone(),
            decision: decision.as_str().to_owned(),
            comment: response.comment.clone(),
            responded_at: response.responded_at,
        };
        (response, event)
    };
    state.metrics().quote_response(decision.as_str());

    let crm = state.crm();
    let forwarded = if crm.is_enabled() {
        match crm.forward_quote_response(&event).await {
            Ok(()) => {
                state.metrics().crm_request("quote_response", "success");
                if let Err(err) = state.store().mark_response_forwarded(response.id) {
                    error!(response = response.id, error = %err, "failed to flag quote response as forwarded");
                }
                true
            }
            Err(err) => {
                state.metrics().crm_request("quote_response", "error");
                warn!(quotation = id, error = %err, "quote response kept locally; crm forward failed");
                false
            }
        }
    } else {
        debug!(quotation = id, "crm disabled; quote response not forwarded");
        false
    };

    Ok(Json(RespondResponse {
        status: decision.resulting_status().as_str().to_owned(),
        forwarded,
    }))
}

struct RenderedQuotation {
    reference: String,
    html: String,
}

fn render(state: &PortalState, client: &Client, id: i64) -> Result<RenderedQuotation, ApiError> {
    let (quotation, project, priced) = {
        let store = state.store();
        let quotation = client_quotation(&store, client, id)?.ok_or_else(|| missing(id))?;
        let priced: PricedQuotation =
            price_quotation(&store, &quotation, &state.config().pricing.default_vat_rate)?;
        let project = parent_project(&store, &quotation)?;
        (quotation, project, priced)
    };
    let view = quotation_view(
        client,
        &quotation,
        project.as_ref(),
        &priced,
        &state.config().pricing.currency,
        state.today(),
    );
    let html = render_quotation_html(&view, &state.config().company).map_err(|err| {
        error!(quotation = id, error = %err, "quotation template failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "could not render quotation")
    })?;
    Ok(RenderedQuotation {
        reference: quotation.reference,
        html,
    })
}

pub(crate) async fn html(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    Ok(Html(render(&state, &session.client, id)?.html))
}

pub(crate) async fn pdf(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(renderer) = state.pdf() else {
        state.metrics().pdf_render("unavailable");
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "pdf rendering is not configured",
        ));
    };
    let rendered = render(&state, &session.client, id)?;

    let bytes = match renderer.render(&rendered.html).await {
        Ok(bytes) => bytes,
        Err(err) => {
            state.metrics().pdf_render("error");
            warn!(quotation = id, error = %err, "pdf renderer failed");
            return Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "pdf renderer unavailable",
            ));
        }
    };
    state.metrics().pdf_render("success");
    info!(quotation = id, bytes = bytes.len(), "quotation pdf served");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        pdf_file_name(&rendered.reference)
    );
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_owned()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
