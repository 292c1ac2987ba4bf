//! ---
//! portal_section: "03-persistence"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Entity-attribute-value storage and record reconstruction."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Demonstration data for local runs and integration tests.

use chrono::{Days, Utc};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::eav::EntityKind;
use crate::store::{ClientId, EntityId, NewClient, PortalStore};
use crate::Result;

/// Identifiers of the rows written by [`seed_demo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoIds {
    /// Client with a CRM link and an open quotation.
    pub client: ClientId,
    /// Second client, used to check visibility rules.
    pub other_client: ClientId,
    /// Project of the first client.
    pub project: EntityId,
    /// Sent quotation awaiting an answer.
    pub quotation: EntityId,
    /// Draft quotation of the same project.
    pub draft_quotation: EntityId,
    /// Calculation behind the sent quotation.
    pub calculation: EntityId,
    /// Project of the second client.
    pub other_project: EntityId,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Write two clients with a small project tree each.
///
/// The calculation mixes the line layouts of several back-office releases:
/// a stored line total, a unit price with margin and discount, and a price
/// per square metre.
pub fn seed_demo(store: &mut PortalStore) -> Result<DemoIds> {
    let client = store.insert_client(&NewClient {
        email: "anna@example.com".into(),
        name: "Anna de Vries".into(),
        company: Some("Bakkerij De Vries".into()),
        crm_id: Some("C-1001".into()),
    })?;
    let other = store.insert_client(&NewClient {
        email: "bram@example.com".into(),
        name: "Bram Jansen".into(),
        company: None,
        crm_id: None,
    })?;

    let valid_until = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(30))
        .unwrap_or_else(|| Utc::now().date_naive());

    let project = store.create_record(
        EntityKind::Project,
        client.id,
        None,
        &object(json!({
            "project_name": "Shopfront renewal",
            "project_number": "P-2024-118",
            "status": "in progress",
            "description": "New fascia, window graphics and a hanging banner.",
            "deadline": "2024-06-14"
        })),
    )?;
    let quotation = store.create_record(
        EntityKind::Quotation,
        client.id,
        Some(project),
        &object(json!({
            "quote_number": "Q-2024-031",
            "status": "sent",
            "valid_until": valid_until.format("%Y-%m-%d").to_string(),
            "offer_price": "1.600,00",
            "btw": "21",
            "intro": "Thank you for your enquiry. Below is our offer for the shopfront.",
            "notes": "Installation on site is included."
        })),
    )?;
    let calculation = store.create_record(
        EntityKind::Calculation,
        client.id,
        Some(quotation),
        &object(json!({
            "title": "Shopfront",
            "lines": [
                { "description": "Illuminated fascia", "line_total": "1.250,00" },
                {
                    "name": "Window vinyl",
                    "sell_price": "35,50",
                    "qty": "4",
                    "margin_factor": "1,25",
                    "discount_pct": "10"
                },
                {
                    "product": "Mesh banner",
                    "m2_price": "18",
                    "width": "3000",
                    "height": "1000",
                    "count": "2",
                    "uom": "pcs"
                }
            ]
        })),
    )?;
    let draft_quotation = store.create_record(
        EntityKind::Quotation,
        client.id,
        Some(project),
        &object(json!({ "reference": "Q-2024-040", "status": "draft" })),
    )?;
    let other_project = store.create_record(
        EntityKind::Project,
        other.id,
        None,
        &object(json!({ "title": "Vehicle lettering" })),
    )?;

    info!(client = client.id, other_client = other.id, "demo data written");
    Ok(DemoIds {
        client: client.id,
        other_client: other.id,
        project,
        quotation,
        draft_quotation,
        calculation,
        other_project,
    })
}
