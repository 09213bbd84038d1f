//! Store boundary: the three lookups the gift workflow needs plus the conditional gift write.
//! `PgStore` backs production; `InMemoryStore` backs tests and local runs.

mod memory;
mod pg;

pub use memory::{InMemoryStore, Seed};
pub use pg::PgStore;

use crate::config::DbConfig;
use crate::error::{AppError, StoreError};
use crate::model::{Customer, Pet, Purchase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::ConnectOptions;
use std::sync::Arc;

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, StoreError>;

    /// Set `gift_type` only while it is still null. Returns false when a gift was already recorded.
    async fn assign_gift(&self, id: &str, gift_type: &str) -> Result<bool, StoreError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Purchases of `customer_id` made strictly before `cutoff`.
    async fn valid_purchases(
        &self,
        customer_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Purchase>, StoreError>;
}

#[async_trait]
pub trait PetStore: Send + Sync {
    async fn pets_by_owner(&self, owner_id: &str) -> Result<Vec<Pet>, StoreError>;
}

/// The collaborators handed to the gift workflow and the HTTP layer.
#[derive(Clone)]
pub struct Stores {
    pub customers: Arc<dyn CustomerStore>,
    pub purchases: Arc<dyn PurchaseStore>,
    pub pets: Arc<dyn PetStore>,
}

impl Stores {
    /// Use one backend for all three stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CustomerStore + PurchaseStore + PetStore + 'static,
    {
        Stores {
            customers: store.clone(),
            purchases: store.clone(),
            pets: store,
        }
    }
}

/// Ensure the configured database exists; create it if not. Connects to the
/// server's `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(db: &DbConfig) -> Result<(), AppError> {
    if db.name == "postgres" {
        return Ok(());
    }
    let mut conn: sqlx::PgConnection = db.admin_connect_options().connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db.name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db.name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db.name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
