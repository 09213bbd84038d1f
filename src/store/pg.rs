//! PostgreSQL-backed stores.

use crate::error::StoreError;
use crate::model::{Customer, Pet, Purchase};
use crate::store::{CustomerStore, PetStore, PurchaseStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const FIND_CUSTOMER: &str = "SELECT id, first_name, last_name, gift_type FROM customers WHERE id = $1";

// The `gift_type IS NULL` guard makes the latch a compare-and-set.
const ASSIGN_GIFT: &str = "UPDATE customers SET gift_type = $2, updated_at = NOW() WHERE id = $1 AND gift_type IS NULL";

const VALID_PURCHASES: &str =
    "SELECT id, customer_id, purchased_at FROM purchases WHERE customer_id = $1 AND purchased_at < $2 ORDER BY purchased_at";

const PETS_BY_OWNER: &str = "SELECT id, owner_id, name, species FROM pets WHERE owner_id = $1 ORDER BY id";

#[async_trait]
impl CustomerStore for PgStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, StoreError> {
        tracing::debug!(sql = %FIND_CUSTOMER, id, "query");
        let row = sqlx::query_as::<_, Customer>(FIND_CUSTOMER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn assign_gift(&self, id: &str, gift_type: &str) -> Result<bool, StoreError> {
        tracing::debug!(sql = %ASSIGN_GIFT, id, gift_type, "query");
        let done = sqlx::query(ASSIGN_GIFT)
            .bind(id)
            .bind(gift_type)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn valid_purchases(
        &self,
        customer_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Purchase>, StoreError> {
        tracing::debug!(sql = %VALID_PURCHASES, customer_id, %cutoff, "query");
        let rows = sqlx::query_as::<_, Purchase>(VALID_PURCHASES)
            .bind(customer_id)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl PetStore for PgStore {
    async fn pets_by_owner(&self, owner_id: &str) -> Result<Vec<Pet>, StoreError> {
        tracing::debug!(sql = %PETS_BY_OWNER, owner_id, "query");
        let rows = sqlx::query_as::<_, Pet>(PETS_BY_OWNER)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
