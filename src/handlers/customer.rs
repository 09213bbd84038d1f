//! Customer handlers: gift eligibility.

use crate::error::AppError;
use crate::extractors::CustomerId;
use crate::response::{already_processed, success_ok, MessageSheet};
use crate::service::GiftOutcome;
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

/// POST /api/v1/customers/:customer_id/gift-eligibility
pub async fn gift_eligibility(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<Response, AppError> {
    match state.gifts.evaluate(&customer_id).await? {
        GiftOutcome::Assigned(assignment) => Ok(success_ok(MessageSheet {
            message: assignment.message(),
        })
        .into_response()),
        GiftOutcome::AlreadyProcessed => Ok(already_processed().into_response()),
    }
}
