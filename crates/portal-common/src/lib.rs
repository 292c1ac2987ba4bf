//! ---
//! portal_section: "01-core-functionality"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Shared primitives and utilities for the portal runtime."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Shared primitives for the client portal workspace: configuration loading,
//! tracing initialisation and build metadata.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    AppConfig, CompanyConfig, CrmConfig, DatabaseConfig, LoadedAppConfig, LoggingConfig,
    PdfConfig, PricingConfig, ServerConfig, SessionConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
