//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Envelope used by every successful API response: a status message plus the payload.
#[derive(Serialize)]
pub struct Success<T> {
    pub message: &'static str,
    pub sheets: T,
}

#[derive(Serialize)]
pub struct MessageSheet {
    pub message: String,
}

pub const RETRIEVED: &str = "successfully retrieved";

pub fn success_ok<T: Serialize>(sheets: T) -> (StatusCode, Json<Success<T>>) {
    (
        StatusCode::OK,
        Json(Success {
            message: RETRIEVED,
            sheets,
        }),
    )
}

/// 400 with a JSON `null` body, used for requests that were already handled.
pub fn already_processed() -> (StatusCode, Json<Option<()>>) {
    (StatusCode::BAD_REQUEST, Json(None))
}
