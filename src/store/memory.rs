//! Process-local store with the same latch semantics as the PostgreSQL one.

use crate::error::StoreError;
use crate::model::{Customer, Pet, Purchase};
use crate::store::{CustomerStore, PetStore, PurchaseStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Initial records for an `InMemoryStore`, typically read from a JSON file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl Seed {
    pub async fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("seed {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Unavailable(format!("seed {}: {}", path.display(), e)))
    }
}

#[derive(Default)]
struct Inner {
    customers: BTreeMap<String, Customer>,
    purchases: Vec<Purchase>,
    pets: Vec<Pet>,
    gift_writes: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Result<Self, StoreError> {
        let store = Self::new();
        {
            let mut inner = store.write()?;
            for c in seed.customers {
                inner.customers.insert(c.id.clone(), c);
            }
            inner.purchases.extend(seed.purchases);
            inner.pets.extend(seed.pets);
        }
        Ok(store)
    }

    pub fn insert_customer(&self, customer: Customer) -> Result<(), StoreError> {
        self.write()?.customers.insert(customer.id.clone(), customer);
        Ok(())
    }

    pub fn insert_purchase(&self, purchase: Purchase) -> Result<(), StoreError> {
        self.write()?.purchases.push(purchase);
        Ok(())
    }

    pub fn insert_pet(&self, pet: Pet) -> Result<(), StoreError> {
        self.write()?.pets.push(pet);
        Ok(())
    }

    /// Current snapshot of a customer.
    pub fn customer(&self, id: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(id).cloned())
    }

    /// Number of successful gift writes since creation.
    pub fn gift_writes(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.gift_writes)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(id).cloned())
    }

    async fn assign_gift(&self, id: &str, gift_type: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let written = match inner.customers.get_mut(id) {
            Some(c) if c.gift_type.is_none() => {
                c.gift_type = Some(gift_type.to_string());
                true
            }
            _ => false,
        };
        if written {
            inner.gift_writes += 1;
        }
        Ok(written)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl PurchaseStore for InMemoryStore {
    async fn valid_purchases(
        &self,
        customer_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Purchase>, StoreError> {
        let mut out: Vec<Purchase> = self
            .read()?
            .purchases
            .iter()
            .filter(|p| p.customer_id == customer_id && p.purchased_at < cutoff)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.purchased_at);
        Ok(out)
    }
}

#[async_trait]
impl PetStore for InMemoryStore {
    async fn pets_by_owner(&self, owner_id: &str) -> Result<Vec<Pet>, StoreError> {
        let mut out: Vec<Pet> = self
            .read()?
            .pets
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}
