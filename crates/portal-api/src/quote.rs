//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Joins stored quotations with their calculations and prices them.

use chrono::NaiveDate;
use portal_docs::{QuotationLineView, QuotationView};
use portal_pricing::{reconstruct, Amount, PricedQuotation, PricingError};
use portal_store::{
    Calculation, Client, EntityKind, PortalStore, Project, Quotation, StoreError,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("quotation field '{field}' holds an unreadable amount '{value}'")]
    InvalidAmount { field: &'static str, value: String },
}

/// Lines of every calculation below the quotation, in calculation order.
pub fn quotation_lines(store: &PortalStore, quotation: &Quotation) -> Result<Vec<Value>, QuoteError> {
    let mut lines = Vec::new();
    for record in store.children(quotation.id, EntityKind::Calculation)? {
        lines.extend(Calculation::from_record(&record)?.lines);
    }
    Ok(lines)
}

fn parse_amount(field: &'static str, raw: &str) -> Result<Amount, QuoteError> {
    raw.parse().map_err(|_| QuoteError::InvalidAmount {
        field,
        value: raw.to_owned(),
    })
}

/// Reconstruct line prices and totals for a quotation.
///
/// The quotation's own VAT rate wins over `default_vat_rate`.
pub fn price_quotation(
    store: &PortalStore,
    quotation: &Quotation,
    default_vat_rate: &str,
) -> Result<PricedQuotation, QuoteError> {
    let lines = quotation_lines(store, quotation)?;
    let quoted_total = quotation
        .quoted_total
        .as_deref()
        .map(|raw| parse_amount("total", raw))
        .transpose()?;
    let vat_rate = match quotation.vat_rate.as_deref() {
        Some(raw) => parse_amount("vat_rate", raw)?,
        None => parse_amount("vat_rate", default_vat_rate)?,
    };
    Ok(reconstruct(&lines, quoted_total, vat_rate)?)
}

/// Quotation owned by `client`, or `None` when it does not exist for them.
pub fn client_quotation(
    store: &PortalStore,
    client: &Client,
    id: i64,
) -> Result<Option<Quotation>, QuoteError> {
    store
        .client_entity(id, EntityKind::Quotation, client.id)?
        .map(|record| Quotation::from_record(&record))
        .transpose()
        .map_err(QuoteError::from)
}

/// Project a quotation hangs below, when it is still readable.
pub fn parent_project(store: &PortalStore, quotation: &Quotation) -> Result<Option<Project>, QuoteError> {
    let Some(project_id) = quotation.project_id else {
        return Ok(None);
    };
    store
        .client_entity(project_id, EntityKind::Project, quotation.client_id)?
        .map(|record| Project::from_record(&record))
        .transpose()
        .map_err(QuoteError::from)
}

/// Trim a four-decimal amount to its significant digits, e.g. `2.5000` to `2.5`.
pub fn display_number(amount: Amount) -> String {
    let precise = amount.to_precise_string();
    precise
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_owned()
}

/// Printable document model for a priced quotation.
pub fn quotation_view(
    client: &Client,
    quotation: &Quotation,
    project: Option<&Project>,
    priced: &PricedQuotation,
    currency: &str,
    today: NaiveDate,
) -> QuotationView {
    let lines = priced
        .lines
        .iter()
        .map(|line| QuotationLineView {
            description: line.description.clone(),
            quantity: display_number(line.quantity),
            unit: line.unit.clone(),
            price: line.final_amount.to_string(),
        })
        .collect();
    QuotationView {
        reference: quotation.reference.clone(),
        project_title: project.map(|project| project.title.clone()),
        client_name: client.name.clone(),
        client_company: client.company.clone(),
        client_email: client.email.clone(),
        issue_date: quotation.created_at.format("%Y-%m-%d").to_string(),
        valid_until: quotation
            .valid_until
            .map(|date| date.format("%Y-%m-%d").to_string()),
        status: quotation.effective_status(today).as_str().to_owned(),
        intro: quotation.intro.clone(),
        lines,
        net_total: priced.net_total.to_string(),
        vat_rate: display_number(priced.vat_rate),
        vat_total: priced.vat_total.to_string(),
        gross_total: priced.gross_total.to_string(),
        currency: currency.to_owned(),
        notes: quotation.notes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_store::seed_demo;

    fn amount(raw: &str) -> Amount {
        raw.parse().unwrap()
    }

    #[test]
    fn numbers_drop_trailing_zeros() {
        assert_eq!(display_number(amount("2")), "2");
        assert_eq!(display_number(amount("2.50")), "2.5");
        assert_eq!(display_number(amount("0.0125")), "0.0125");
        assert_eq!(display_number(Amount::ZERO), "0");
    }

    #[test]
    fn prices_the_demo_quotation() {
        let mut store = PortalStore::open_in_memory().unwrap();
        let ids = seed_demo(&mut store).unwrap();
        let client = store.client(ids.client).unwrap().unwrap();
        let quotation = client_quotation(&store, &client, ids.quotation)
            .unwrap()
            .unwrap();

        let priced = price_quotation(&store, &quotation, "9").unwrap();
        assert_eq!(priced.raw_total, amount("1517.75"));
        assert_eq!(priced.net_total, amount("1600"));
        assert_eq!(priced.vat_rate, amount("21"));
        assert_eq!(priced.gross_total, amount("1936"));

        let project = parent_project(&store, &quotation).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let view = quotation_view(&client, &quotation, project.as_ref(), &priced, "EUR", today);
        assert_eq!(view.lines.len(), 3);
        assert_eq!(view.project_title.as_deref(), Some("Shopfront renewal"));
        assert_eq!(view.lines[2].unit.as_deref(), Some("pcs"));
        assert_eq!(view.vat_rate, "21");
    }

    #[test]
    fn other_clients_quotation_is_invisible() {
        let mut store = PortalStore::open_in_memory().unwrap();
        let ids = seed_demo(&mut store).unwrap();
        let other = store.client(ids.other_client).unwrap().unwrap();
        assert!(client_quotation(&store, &other, ids.quotation)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unreadable_quoted_total_is_reported() {
        let mut store = PortalStore::open_in_memory().unwrap();
        let ids = seed_demo(&mut store).unwrap();
        store
            .set_attribute(ids.quotation, "offer_price", Some("1600/1700"))
            .unwrap();
        let client = store.client(ids.client).unwrap().unwrap();
        let quotation = client_quotation(&store, &client, ids.quotation)
            .unwrap()
            .unwrap();
        let err = price_quotation(&store, &quotation, "21").unwrap_err();
        assert!(matches!(err, QuoteError::InvalidAmount { field: "total", .. }));
    }
}
