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

use prometheus::{IntCounterVec, Opts, Registry};

/// Counters exported at `/metrics`.
#[derive(Clone, Debug)]
pub struct PortalMetrics {
    registry: Arc<Registry>,
    logins: IntCounterVec,
    quote_responses: IntCounterVec,
    pdf_renders: IntCounterVec,
    crm_requests: IntCounterVec,
}

impl PortalMetrics {
    pub fn new(registry: Arc<Registry>) -> prometheus::Result<Self> {
        let logins = IntCounterVec::new(
            Opts::new("portal_logins_total", "Login attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(logins.clone()))?;

        let quote_responses = IntCounterVec::new(
            Opts::new(
                "portal_quote_responses_total",
                "Quotation answers recorded, by decision",
            ),
            &["decision"],
        )?;
        registry.register(Box::new(quote_responses.clone()))?;

        let pdf_renders = IntCounterVec::new(
            Opts::new("portal_pdf_renders_total", "PDF render requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(pdf_renders.clone()))?;

        let crm_requests = IntCounterVec::new(
            Opts::new(
                "portal_crm_requests_total",
                "Calls to the upstream CRM by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(crm_requests.clone()))?;

        Ok(Self {
            registry,
            logins,
            quote_responses,
            pdf_renders,
            crm_requests,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn login(&self, outcome: &str) {
        self.logins.with_label_values(&[outcome]).inc();
    }

    pub fn quote_response(&self, decision: &str) {
        self.quote_responses.with_label_values(&[decision]).inc();
    }

    pub fn pdf_render(&self, outcome: &str) {
        self.pdf_renders.with_label_values(&[outcome]).inc();
    }

    pub fn crm_request(&self, operation: &str, outcome: &str) {
        self.crm_requests
            .with_label_values(&[operation, outcome])
            .inc();
    }
}
