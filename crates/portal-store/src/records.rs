//! ---
//! portal_section: "03-persistence"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Entity-attribute-value storage and record reconstruction."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Typed views over reconstructed records.
//!
//! Older back-office releases stored the same concept under different
//! attribute names; each view reads the first name that carries a value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::eav::{EavRecord, EntityKind};
use crate::store::{ClientId, EntityId};
use crate::Result;

const PROJECT_TITLE: &[&str] = &["title", "name", "project_name"];
const PROJECT_REFERENCE: &[&str] = &["reference", "project_number"];
const DELIVERY_DATE: &[&str] = &["delivery_date", "deadline"];
const QUOTE_REFERENCE: &[&str] = &["reference", "quote_number", "number"];
const QUOTED_TOTAL: &[&str] = &["total", "offer_price", "quoted_price", "net_total"];
const VAT_RATE: &[&str] = &["vat_rate", "btw"];
const INTRO: &[&str] = &["intro", "introduction"];
const NOTES: &[&str] = &["notes", "remarks"];
const CALCULATION_TITLE: &[&str] = &["title", "name", "description"];
const LINES: &[&str] = &["lines", "items", "rows"];

fn text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match fields.get(*name)? {
        Value::String(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Lifecycle of a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    /// Being prepared; not visible as an offer yet.
    Draft,
    /// Sent to the client and awaiting an answer.
    Sent,
    /// Accepted by the client.
    Accepted,
    /// Declined by the client.
    Rejected,
    /// No answer before the validity date.
    Expired,
}

impl QuotationStatus {
    /// Attribute value for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Expired => "expired",
        }
    }

    /// Lenient parse of a stored status; anything unknown is a draft.
    pub fn from_attribute(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("sent") => QuotationStatus::Sent,
            Some("accepted") => QuotationStatus::Accepted,
            Some("rejected") => QuotationStatus::Rejected,
            Some("expired") => QuotationStatus::Expired,
            _ => QuotationStatus::Draft,
        }
    }
}

/// A client's project.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    /// Entity identifier.
    pub id: EntityId,
    /// Owning client.
    pub client_id: ClientId,
    /// Display title; falls back to the reference or the id.
    pub title: String,
    /// Back-office project number.
    pub reference: Option<String>,
    /// Free-form status text.
    pub status: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Planned delivery date as stored.
    pub delivery_date: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// View a project record.
    pub fn from_record(record: &EavRecord) -> Result<Self> {
        record.expect_kind(EntityKind::Project)?;
        let fields = &record.fields;
        let reference = text(fields, PROJECT_REFERENCE);
        let title = text(fields, PROJECT_TITLE)
            .or_else(|| reference.clone())
            .unwrap_or_else(|| format!("Project {}", record.id));
        Ok(Self {
            id: record.id,
            client_id: record.client_id,
            title,
            reference,
            status: text(fields, &["status"]),
            description: text(fields, &["description"]),
            delivery_date: text(fields, DELIVERY_DATE),
            created_at: record.created_at,
        })
    }
}

/// An offer sent to a client.
#[derive(Debug, Clone, Serialize)]
pub struct Quotation {
    /// Entity identifier.
    pub id: EntityId,
    /// Project the quotation belongs to.
    pub project_id: Option<EntityId>,
    /// Owning client.
    pub client_id: ClientId,
    /// Quotation number; falls back to the id.
    pub reference: String,
    /// Stored status.
    pub status: QuotationStatus,
    /// Last day the offer can be accepted.
    pub valid_until: Option<NaiveDate>,
    /// Net total as quoted, unparsed.
    pub quoted_total: Option<String>,
    /// VAT percentage, unparsed.
    pub vat_rate: Option<String>,
    /// Opening text.
    pub intro: Option<String>,
    /// Closing remarks.
    pub notes: Option<String>,
    /// When the client answered, as stored.
    pub responded_at: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Quotation {
    /// View a quotation record.
    pub fn from_record(record: &EavRecord) -> Result<Self> {
        record.expect_kind(EntityKind::Quotation)?;
        let fields = &record.fields;
        let valid_until = text(fields, &["valid_until"]).and_then(|raw| {
            let parsed = parse_date(&raw);
            if parsed.is_none() {
                warn!(quotation = record.id, value = %raw, "unreadable valid_until");
            }
            parsed
        });
        Ok(Self {
            id: record.id,
            project_id: record.parent_id,
            client_id: record.client_id,
            reference: text(fields, QUOTE_REFERENCE).unwrap_or_else(|| record.id.to_string()),
            status: QuotationStatus::from_attribute(text(fields, &["status"]).as_deref()),
            valid_until,
            quoted_total: text(fields, QUOTED_TOTAL),
            vat_rate: text(fields, VAT_RATE),
            intro: text(fields, INTRO),
            notes: text(fields, NOTES),
            responded_at: text(fields, &["responded_at"]),
            created_at: record.created_at,
        })
    }

    /// Status as the client sees it on `today`: a sent quotation past its
    /// validity date has expired.
    pub fn effective_status(&self, today: NaiveDate) -> QuotationStatus {
        match (self.status, self.valid_until) {
            (QuotationStatus::Sent, Some(until)) if today > until => QuotationStatus::Expired,
            (status, _) => status,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%d-%m-%Y"))
        .ok()
}

/// Priced breakdown behind a quotation.
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    /// Entity identifier.
    pub id: EntityId,
    /// Quotation the calculation belongs to.
    pub quotation_id: Option<EntityId>,
    /// Optional heading.
    pub title: Option<String>,
    /// Line objects as reconstructed; priced elsewhere.
    pub lines: Vec<Value>,
}

impl Calculation {
    /// View a calculation record.
    pub fn from_record(record: &EavRecord) -> Result<Self> {
        record.expect_kind(EntityKind::Calculation)?;
        let fields = &record.fields;
        let lines = LINES
            .iter()
            .find_map(|name| fields.get(*name))
            .map(|value| match value {
                Value::Array(items) => items.clone(),
                Value::Object(map) => map.values().cloned().collect(),
                other => {
                    warn!(calculation = record.id, value = %other, "calculation lines are not a list");
                    Vec::new()
                }
            })
            .unwrap_or_default();
        Ok(Self {
            id: record.id,
            quotation_id: record.parent_id,
            title: text(fields, CALCULATION_TITLE),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(kind: EntityKind, fields: Value) -> EavRecord {
        let Value::Object(fields) = fields else {
            unreachable!("fixture must be an object")
        };
        EavRecord {
            id: 7,
            kind,
            client_id: 1,
            parent_id: Some(3),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            fields,
        }
    }

    #[test]
    fn project_reads_legacy_names() {
        let project = Project::from_record(&record(
            EntityKind::Project,
            json!({ "project_name": "Van wrap", "project_number": "P-204", "deadline": "2024-05-01" }),
        ))
        .unwrap();
        assert_eq!(project.title, "Van wrap");
        assert_eq!(project.reference.as_deref(), Some("P-204"));
        assert_eq!(project.delivery_date.as_deref(), Some("2024-05-01"));

        let untitled = Project::from_record(&record(EntityKind::Project, json!({}))).unwrap();
        assert_eq!(untitled.title, "Project 7");
    }

    #[test]
    fn quotation_status_and_expiry() {
        let quotation = Quotation::from_record(&record(
            EntityKind::Quotation,
            json!({ "quote_number": "Q-2024-031", "status": " Sent ", "valid_until": "2024-04-30", "offer_price": "1.600,00", "btw": "9" }),
        ))
        .unwrap();
        assert_eq!(quotation.reference, "Q-2024-031");
        assert_eq!(quotation.status, QuotationStatus::Sent);
        assert_eq!(quotation.quoted_total.as_deref(), Some("1.600,00"));
        assert_eq!(quotation.vat_rate.as_deref(), Some("9"));

        let before = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(quotation.effective_status(before), QuotationStatus::Sent);
        assert_eq!(quotation.effective_status(after), QuotationStatus::Expired);
    }

    #[test]
    fn unknown_status_is_draft_and_dates_are_lenient() {
        let quotation = Quotation::from_record(&record(
            EntityKind::Quotation,
            json!({ "status": "pending-review", "valid_until": "31-12-2024" }),
        ))
        .unwrap();
        assert_eq!(quotation.status, QuotationStatus::Draft);
        assert_eq!(quotation.valid_until, NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(quotation.reference, "7");
    }

    #[test]
    fn accepted_quotation_never_expires() {
        let quotation = Quotation::from_record(&record(
            EntityKind::Quotation,
            json!({ "status": "accepted", "valid_until": "2020-01-01" }),
        ))
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(quotation.effective_status(today), QuotationStatus::Accepted);
    }

    #[test]
    fn calculation_lines_come_from_any_legacy_key() {
        let calculation = Calculation::from_record(&record(
            EntityKind::Calculation,
            json!({ "name": "Signage", "items": [{ "price": "10" }, { "price": "20" }] }),
        ))
        .unwrap();
        assert_eq!(calculation.title.as_deref(), Some("Signage"));
        assert_eq!(calculation.lines.len(), 2);
        assert_eq!(calculation.quotation_id, Some(3));
    }

    #[test]
    fn views_check_the_kind() {
        let err = Quotation::from_record(&record(EntityKind::Project, json!({}))).unwrap_err();
        assert!(err.to_string().contains("expected quotation"));
    }
}
