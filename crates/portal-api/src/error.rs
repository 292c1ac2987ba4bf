//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_pricing::PricingError;
use portal_store::StoreError;
use serde::Serialize;
use tracing::error;

use crate::quote::QuoteError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

/// Error returned by handlers; rendered as `{ "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not signed in")
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(what),
            other => {
                error!(error = %other, "store operation failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error")
            }
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::Store(err) => err.into(),
            QuoteError::Pricing(err) => err.into(),
            invalid @ QuoteError::InvalidAmount { .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, invalid.to_string())
            }
        }
    }
}
