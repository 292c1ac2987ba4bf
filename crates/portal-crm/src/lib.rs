//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Gateway to the upstream CRM REST API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Orders live in the CRM, not in the portal database. The portal reads them
//! per client and pushes quote responses back through a webhook.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_common::CrmConfig;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

mod http;

pub use http::HttpCrmGateway;

/// Result alias for CRM calls.
pub type Result<T> = std::result::Result<T, CrmError>;

/// Errors raised while talking to the CRM.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// The CRM answered with a non-success status.
    #[error("crm responded with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },
    /// Connection, timeout or TLS failure.
    #[error("crm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response body did not match the expected shape.
    #[error("unexpected crm payload: {0}")]
    Decode(String),
    /// The configured base URL cannot be used.
    #[error("invalid crm url '{0}'")]
    InvalidUrl(String),
    /// No CRM is configured.
    #[error("crm integration is disabled")]
    Disabled,
}

/// An order as reported by the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub status: String,
    /// Order total as the CRM formats it.
    #[serde(default, deserialize_with = "string_or_number")]
    pub total: String,
    #[serde(default)]
    pub placed_at: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
}

/// Payload of the quote-response webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponseEvent {
    pub quotation_id: i64,
    pub reference: String,
    pub client_email: String,
    pub crm_client_id: Option<String>,
    /// `accept` or `reject`.
    pub decision: String,
    pub comment: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// Operations the portal needs from the CRM.
#[async_trait]
pub trait CrmGateway: Send + Sync + 'static {
    /// Orders placed by the client with this CRM identifier.
    async fn orders_for(&self, crm_client_id: &str) -> Result<Vec<Order>>;

    /// Notify the CRM that a client answered a quotation.
    async fn forward_quote_response(&self, event: &QuoteResponseEvent) -> Result<()>;

    /// False when calls never leave the process.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when no CRM is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCrm;

#[async_trait]
impl CrmGateway for DisabledCrm {
    async fn orders_for(&self, _crm_client_id: &str) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn forward_quote_response(&self, _event: &QuoteResponseEvent) -> Result<()> {
        Err(CrmError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Build the gateway described by the configuration.
pub fn gateway_from_config(config: &CrmConfig) -> Result<Arc<dyn CrmGateway>> {
    match config.base_url.as_deref().map(str::trim) {
        Some(base_url) if !base_url.is_empty() => {
            let gateway =
                HttpCrmGateway::new(base_url, config.api_key.clone(), config.timeout)?;
            info!(base_url, "crm gateway enabled");
            Ok(Arc::new(gateway))
        }
        _ => {
            info!("crm base_url not configured; orders and webhooks are disabled");
            Ok(Arc::new(DisabledCrm))
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn orders_accept_numeric_fields() {
        let order: Order = serde_json::from_str(
            r#"{"id": 4411, "reference": "SO-4411", "status": "in production", "total": 1936.5, "placed_at": "2024-03-02"}"#,
        )
        .unwrap();
        assert_eq!(order.id, "4411");
        assert_eq!(order.total, "1936.5");
        assert!(order.delivery_date.is_none());
    }

    #[tokio::test]
    async fn disabled_crm_has_no_orders_and_refuses_webhooks() {
        let crm = DisabledCrm;
        assert!(crm.orders_for("C-1").await.unwrap().is_empty());
        let event = QuoteResponseEvent {
            quotation_id: 1,
            reference: "Q-1".into(),
            client_email: "a@example.com".into(),
            crm_client_id: None,
            decision: "accept".into(),
            comment: None,
            responded_at: Utc::now(),
        };
        assert!(matches!(
            crm.forward_quote_response(&event).await,
            Err(CrmError::Disabled)
        ));
        assert!(!crm.is_enabled());
    }

    #[test]
    fn config_without_url_disables_the_gateway() {
        let gateway = gateway_from_config(&CrmConfig::default()).unwrap();
        assert!(!gateway.is_enabled());

        let config = CrmConfig {
            base_url: Some("https://crm.example.com/api".into()),
            api_key: Some("token".into()),
            timeout: Duration::from_secs(2),
        };
        assert!(gateway_from_config(&config).unwrap().is_enabled());
    }
}
