//! ---
//! portal_section: "06-documents"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Quotation documents: HTML template and PDF renderer gateway."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Quotations are rendered to HTML with Askama and handed to an external
//! HTML-to-PDF service. The portal never rasterises anything itself.

pub mod pdf;
pub mod quotation;

pub use pdf::{pdf_file_name, renderer_from_config, HttpPdfRenderer, PdfRenderer};
pub use quotation::{render_quotation_html, QuotationLineView, QuotationView};

/// Result alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors raised while producing documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
    #[error("pdf renderer transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("pdf renderer responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("pdf renderer returned {0} bytes that are not a PDF document")]
    NotPdf(usize),
    #[error("invalid pdf renderer url '{0}'")]
    InvalidUrl(String),
}
