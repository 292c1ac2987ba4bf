//! ---
//! portal_section: "06-documents"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Quotation documents: HTML template and PDF renderer gateway."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_common::PdfConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::{DocumentError, Result};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Turns a rendered HTML page into PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync + 'static {
    async fn render(&self, html: &str) -> Result<Vec<u8>>;
}

/// Renderer backed by an HTML-to-PDF HTTP service.
#[derive(Debug, Clone)]
pub struct HttpPdfRenderer {
    endpoint: Url,
    client: Client,
}

impl HttpPdfRenderer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| DocumentError::InvalidUrl(endpoint.to_owned()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(DocumentError::InvalidUrl(endpoint.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .header(ACCEPT, "application/pdf")
            .body(html.to_owned())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(512)
                .collect();
            return Err(DocumentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(DocumentError::NotPdf(bytes.len()));
        }
        debug!(bytes = bytes.len(), "pdf rendered");
        Ok(bytes.to_vec())
    }
}

/// Renderer for the configured endpoint, or `None` when PDF output is off.
pub fn renderer_from_config(config: &PdfConfig) -> Result<Option<Arc<dyn PdfRenderer>>> {
    match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => {
            info!(endpoint, "pdf renderer enabled");
            let renderer = HttpPdfRenderer::new(endpoint, config.timeout)?;
            Ok(Some(Arc::new(renderer)))
        }
        _ => Ok(None),
    }
}

/// Download name for a quotation, e.g. `quotation-Q-2024-031.pdf`.
pub fn pdf_file_name(reference: &str) -> String {
    let safe: String = reference
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('_');
    if safe.is_empty() {
        "quotation.pdf".to_owned()
    } else {
        format!("quotation-{safe}.pdf")
    }
}
