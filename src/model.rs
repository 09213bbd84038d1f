//! Domain records: customers, their purchases, and their pets.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Purchases must be at least this old to count toward the gift promotion.
pub const VALID_PURCHASE_AGE_MONTHS: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Species the promotional gift was themed around. `None` until a gift is assigned; never cleared.
    pub gift_type: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_gifted(&self) -> bool {
        self.gift_type.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub customer_id: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub species: String,
}

/// Purchases strictly before the returned instant are valid for gifting.
///
/// Calendar months are used, so the cutoff for 31 August is the end of February.
pub fn valid_purchase_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(VALID_PURCHASE_AGE_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
