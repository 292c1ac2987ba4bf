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
use axum::Json;
use portal_store::{EntityKind, Project, Quotation};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::quotations::{summarize, QuotationSummary};
use crate::session::ClientSession;
use crate::state::PortalState;

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub quotation_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub quotations: Vec<QuotationSummary>,
}

pub(crate) async fn list(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let client = session.client.id;
    let store = state.store();
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for quotation in store.list_entities(EntityKind::Quotation, client)? {
        if let Some(parent) = quotation.parent_id {
            *counts.entry(parent).or_default() += 1;
        }
    }

    let projects = store
        .list_entities(EntityKind::Project, client)?
        .iter()
        .map(|record| {
            Ok(ProjectSummary {
                quotation_count: counts.get(&record.id).copied().unwrap_or(0),
                project: Project::from_record(record)?,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(Json(projects))
}

pub(crate) async fn detail(
    State(state): State<Arc<PortalState>>,
    session: ClientSession,
    Path(id): Path<i64>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let store = state.store();
    let record = store
        .client_entity(id, EntityKind::Project, session.client.id)?
        .ok_or_else(|| ApiError::not_found(format!("project {id}")))?;
    let project = Project::from_record(&record)?;

    let today = state.today();
    let quotations = store
        .children(project.id, EntityKind::Quotation)?
        .iter()
        .map(|record| {
            let quotation = Quotation::from_record(record)?;
            Ok(summarize(&state, &store, &quotation, Some(&project.title), today))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(ProjectDetail {
        project,
        quotations,
    }))
}
