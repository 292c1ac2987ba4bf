//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Gateway to the upstream CRM REST API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{CrmError, CrmGateway, Order, QuoteResponseEvent, Result};

const MAX_ERROR_BODY: usize = 512;

/// CRM gateway speaking JSON over HTTP with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpCrmGateway {
    base: Url,
    api_key: Option<String>,
    client: Client,
}

/// Older CRM releases wrap the list in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum OrdersPayload {
    List(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

impl HttpCrmGateway {
    /// Create a gateway for `base_url`, e.g. `https://crm.example.com/api`.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|_| CrmError::InvalidUrl(base_url.to_owned()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(CrmError::InvalidUrl(base_url.to_owned()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CrmError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|index| body.is_char_boundary(*index))
            .unwrap_or(0);
        body.truncate(cut);
    }
    Err(CrmError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CrmGateway for HttpCrmGateway {
    async fn orders_for(&self, crm_client_id: &str) -> Result<Vec<Order>> {
        let url = self.endpoint(&["clients", crm_client_id, "orders"])?;
        debug!(%url, "fetching crm orders");
        let response = self.authorised(self.client.get(url)).send().await?;
        let body = ensure_success(response).await?.text().await?;
        let orders = match serde_json::from_str::<OrdersPayload>(&body)
            .map_err(|err| CrmError::Decode(err.to_string()))?
        {
            OrdersPayload::List(orders) | OrdersPayload::Wrapped { orders } => orders,
        };
        debug!(crm_client_id, count = orders.len(), "crm orders received");
        Ok(orders)
    }

    async fn forward_quote_response(&self, event: &QuoteResponseEvent) -> Result<()> {
        let url = self.endpoint(&["webhooks", "quote-response"])?;
        let response = self
            .authorised(self.client.post(url))
            .json(event)
            .send()
            .await?;
        if let Err(err) = ensure_success(response).await {
            warn!(quotation = event.quotation_id, error = %err, "crm rejected quote response");
            return Err(err);
        }
        debug!(quotation = event.quotation_id, "quote response forwarded");
        Ok(())
    }
}
