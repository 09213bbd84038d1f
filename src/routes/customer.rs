//! Customer routes, nested under the API prefix.

use crate::handlers::gift_eligibility;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn customer_routes(state: AppState) -> Router {
    Router::new()
        .route("/customers/:customer_id/gift-eligibility", post(gift_eligibility))
        .with_state(state)
}
