//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// JSON request body whose rejections render as `ApiError` (400) instead of
/// axum's plain-text responses.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "request body rejected");
                Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    rejection.body_text(),
                ))
            }
        }
    }
}
