//! Business workflows over the store traits.

mod gift;
pub use gift::{select_pet, GiftAssignment, GiftError, GiftOutcome, GiftService, IneligibleReason};
