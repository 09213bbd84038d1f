//! Extract and normalise the `:customer_id` path segment.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// Trimmed, non-blank customer id taken from the route path.
#[derive(Clone, Debug)]
pub struct CustomerId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CustomerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let id = raw.trim();
        if id.is_empty() {
            return Err(AppError::BadRequest("customer id must not be blank".into()));
        }
        Ok(CustomerId(id.to_string()))
    }
}
