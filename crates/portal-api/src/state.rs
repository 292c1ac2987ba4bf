//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use parking_lot::{Mutex, MutexGuard};
use portal_common::{AppConfig, VersionInfo};
use portal_crm::{gateway_from_config, CrmGateway};
use portal_docs::{renderer_from_config, PdfRenderer};
use portal_store::PortalStore;
use prometheus::Registry;

use crate::metrics::PortalMetrics;

/// Shared state handed to every handler.
///
/// The SQLite connection sits behind a mutex; handlers take the lock for a
/// single store call and never hold it across an `.await`.
pub struct PortalState {
    config: AppConfig,
    store: Mutex<PortalStore>,
    crm: Arc<dyn CrmGateway>,
    pdf: Option<Arc<dyn PdfRenderer>>,
    metrics: PortalMetrics,
    version: VersionInfo,
    start: Instant,
}

impl PortalState {
    pub fn new(
        config: AppConfig,
        store: PortalStore,
        crm: Arc<dyn CrmGateway>,
        pdf: Option<Arc<dyn PdfRenderer>>,
        registry: Arc<Registry>,
    ) -> Result<Self> {
        let metrics =
            PortalMetrics::new(registry).context("failed to register portal metrics")?;
        Ok(Self {
            config,
            store: Mutex::new(store),
            crm,
            pdf,
            metrics,
            version: VersionInfo::current(),
            start: Instant::now(),
        })
    }

    /// Open the database and build the outbound gateways described by `config`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = PortalStore::open(&config.database.path).with_context(|| {
            format!(
                "failed to open portal database {}",
                config.database.path.display()
            )
        })?;
        let crm = gateway_from_config(&config.crm).context("failed to configure crm gateway")?;
        let pdf =
            renderer_from_config(&config.pdf).context("failed to configure pdf renderer")?;
        Self::new(config, store, crm, pdf, Arc::new(Registry::new()))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> MutexGuard<'_, PortalStore> {
        self.store.lock()
    }

    pub fn crm(&self) -> Arc<dyn CrmGateway> {
        self.crm.clone()
    }

    pub fn pdf(&self) -> Option<Arc<dyn PdfRenderer>> {
        self.pdf.clone()
    }

    pub fn metrics(&self) -> &PortalMetrics {
        &self.metrics
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

impl fmt::Debug for PortalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalState")
            .field("version", &self.version)
            .field("database", &self.config.database.path)
            .field("crm_enabled", &self.crm.is_enabled())
            .field("pdf_enabled", &self.pdf.is_some())
            .finish_non_exhaustive()
    }
}
