//! ---
//! portal_section: "06-documents"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Quotation documents: HTML template and PDF renderer gateway."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use askama::Template;
use portal_common::CompanyConfig;
use serde::Serialize;
use tracing::debug;

use crate::Result;

/// One printed line of a quotation. Amounts are preformatted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuotationLineView {
    pub description: String,
    pub quantity: String,
    pub unit: Option<String>,
    pub price: String,
}

/// Everything printed on a quotation document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuotationView {
    pub reference: String,
    pub project_title: Option<String>,
    pub client_name: String,
    pub client_company: Option<String>,
    pub client_email: String,
    /// Issue date, `YYYY-MM-DD`.
    pub issue_date: String,
    pub valid_until: Option<String>,
    pub status: String,
    pub intro: Option<String>,
    pub lines: Vec<QuotationLineView>,
    pub net_total: String,
    pub vat_rate: String,
    pub vat_total: String,
    pub gross_total: String,
    pub currency: String,
    pub notes: Option<String>,
}

#[derive(Template)]
#[template(path = "quotation.html")]
struct QuotationTemplate<'a> {
    view: &'a QuotationView,
    company: &'a CompanyConfig,
}

/// Render the quotation as a standalone HTML page. All text is escaped.
pub fn render_quotation_html(view: &QuotationView, company: &CompanyConfig) -> Result<String> {
    let html = QuotationTemplate { view, company }.render()?;
    debug!(reference = %view.reference, bytes = html.len(), "quotation rendered");
    Ok(html)
}
