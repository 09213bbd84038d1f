//! Gift eligibility workflow: decide whether a customer earns the one-time pet gift,
//! pick the pet the gift is themed around, and record it.

use crate::error::{AppError, StoreError};
use crate::model::{valid_purchase_cutoff, Customer, Pet};
use crate::store::Stores;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IneligibleReason {
    #[error("Customer has no purchases of more than 6 months")]
    NoValidPurchases,
    #[error("Customer does not have pets")]
    NoPets,
}

#[derive(Error, Debug)]
pub enum GiftError {
    #[error("customer id must not be blank")]
    InvalidId,
    #[error("Customer not found")]
    NotFound,
    #[error("{0}")]
    Ineligible(IneligibleReason),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GiftError> for AppError {
    fn from(e: GiftError) -> Self {
        match e {
            GiftError::InvalidId => AppError::BadRequest(e.to_string()),
            GiftError::NotFound => AppError::NotFound(e.to_string()),
            GiftError::Ineligible(reason) => AppError::Ineligible(reason.to_string()),
            GiftError::Store(s) => AppError::Store(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GiftAssignment {
    pub customer: Customer,
    pub pet: Pet,
}

impl GiftAssignment {
    pub fn message(&self) -> String {
        format!(
            "{}: a gift was assigned for his {}",
            self.customer.full_name(),
            self.pet.species
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GiftOutcome {
    /// The gift was recorded by this call. `customer.gift_type` reflects the write.
    Assigned(GiftAssignment),
    /// The customer already holds a gift; nothing was written.
    AlreadyProcessed,
}

/// Uniform choice over every pet. `None` only for an empty slice.
pub fn select_pet<'a, R>(pets: &'a [Pet], rng: &mut R) -> Option<&'a Pet>
where
    R: Rng,
{
    if pets.is_empty() {
        return None;
    }
    pets.get(rng.random_range(0..pets.len()))
}

#[derive(Clone)]
pub struct GiftService {
    stores: Stores,
}

impl GiftService {
    pub fn new(stores: Stores) -> Self {
        GiftService { stores }
    }

    pub async fn evaluate(&self, customer_id: &str) -> Result<GiftOutcome, GiftError> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.evaluate_with(customer_id, Utc::now(), &mut rng).await
    }

    /// Run the workflow as of `now`, drawing the pet from `rng`.
    ///
    /// Reads only until every check has passed; the single write is the last step and is
    /// conditional on the customer still being ungifted, so concurrent calls record one gift.
    pub async fn evaluate_with<R>(
        &self,
        customer_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GiftOutcome, GiftError>
    where
        R: Rng + Send,
    {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(GiftError::InvalidId);
        }

        let Some(mut customer) = self.stores.customers.find_by_id(customer_id).await? else {
            tracing::debug!(customer_id, "customer not found");
            return Err(GiftError::NotFound);
        };
        if customer.is_gifted() {
            tracing::debug!(customer_id, "gift already assigned");
            return Ok(GiftOutcome::AlreadyProcessed);
        }

        let cutoff = valid_purchase_cutoff(now);
        let (purchases, pets) = tokio::try_join!(
            self.stores.purchases.valid_purchases(customer_id, cutoff),
            self.stores.pets.pets_by_owner(customer_id),
        )?;
        tracing::debug!(customer_id, purchases = purchases.len(), pets = pets.len(), "eligibility inputs");

        if purchases.is_empty() {
            tracing::debug!(customer_id, %cutoff, "no purchases older than cutoff");
            return Err(GiftError::Ineligible(IneligibleReason::NoValidPurchases));
        }
        let Some(pet) = select_pet(&pets, rng).cloned() else {
            tracing::debug!(customer_id, "customer has no pets");
            return Err(GiftError::Ineligible(IneligibleReason::NoPets));
        };

        if !self.stores.customers.assign_gift(customer_id, &pet.species).await? {
            // Conditional write missed: either another call holds the latch or the row is gone.
            if self.stores.customers.find_by_id(customer_id).await?.is_none() {
                tracing::debug!(customer_id, "customer removed before gift write");
                return Err(GiftError::NotFound);
            }
            tracing::warn!(customer_id, "gift recorded concurrently, skipping");
            return Ok(GiftOutcome::AlreadyProcessed);
        }
        tracing::info!(customer_id, species = %pet.species, pet_id = %pet.id, "gift assigned");

        customer.gift_type = Some(pet.species.clone());
        Ok(GiftOutcome::Assigned(GiftAssignment { customer, pet }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Purchase;
    use crate::store::{CustomerStore, InMemoryStore, PetStore, PurchaseStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Barrier;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn customer(gift_type: Option<&str>) -> Customer {
        Customer {
            id: "1".into(),
            first_name: "Max".into(),
            last_name: "Smith".into(),
            gift_type: gift_type.map(String::from),
        }
    }

    fn purchase(months_ago: u32) -> Purchase {
        Purchase {
            id: format!("p{}", months_ago),
            customer_id: "1".into(),
            purchased_at: now()
                .checked_sub_months(chrono::Months::new(months_ago))
                .unwrap(),
        }
    }

    fn pet(id: &str, species: &str) -> Pet {
        Pet {
            id: id.into(),
            owner_id: "1".into(),
            name: format!("pet-{}", id),
            species: species.into(),
        }
    }

    /// Canned lookups that count every call; optionally fails purchase lookups.
    #[derive(Default)]
    struct MockStore {
        customer: Mutex<Option<Customer>>,
        purchases: Vec<Purchase>,
        pets: Vec<Pet>,
        fail_purchases: bool,
        assign_result: Option<bool>,
        remove_on_assign: bool,
        writes: AtomicUsize,
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CustomerStore for MockStore {
        async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, StoreError> {
            Ok(self.customer.lock().unwrap().clone().filter(|c| c.id == id))
        }

        async fn assign_gift(&self, _id: &str, gift_type: &str) -> Result<bool, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.written.lock().unwrap().push(gift_type.to_string());
            if self.remove_on_assign {
                *self.customer.lock().unwrap() = None;
                return Ok(false);
            }
            Ok(self.assign_result.unwrap_or(true))
        }
    }

    #[async_trait]
    impl PurchaseStore for MockStore {
        async fn valid_purchases(
            &self,
            _customer_id: &str,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Purchase>, StoreError> {
            if self.fail_purchases {
                return Err(StoreError::Unavailable("purchases offline".into()));
            }
            Ok(self
                .purchases
                .iter()
                .filter(|p| p.purchased_at < cutoff)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl PetStore for MockStore {
        async fn pets_by_owner(&self, _owner_id: &str) -> Result<Vec<Pet>, StoreError> {
            Ok(self.pets.clone())
        }
    }

    fn service(mock: MockStore) -> (GiftService, Arc<MockStore>) {
        let mock = Arc::new(mock);
        (GiftService::new(Stores::shared(mock.clone())), mock)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[tokio::test]
    async fn already_gifted_customer_is_a_no_op() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(Some("cat")))),
            purchases: vec![purchase(7)],
            pets: vec![pet("a", "cat")],
            ..Default::default()
        });
        let outcome = svc.evaluate_with("1", now(), &mut rng()).await.unwrap();
        assert_eq!(outcome, GiftOutcome::AlreadyProcessed);
        assert_eq!(mock.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_customer_is_not_found() {
        let (svc, mock) = service(MockStore::default());
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::NotFound));
        assert_eq!(err.to_string(), "Customer not found");
        assert_eq!(mock.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_id_is_rejected_before_lookup() {
        let (svc, _) = service(MockStore::default());
        let err = svc.evaluate_with("  ", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::InvalidId));
    }

    #[tokio::test]
    async fn recent_purchases_only_is_ineligible() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(1), purchase(5)],
            pets: vec![pet("a", "cat")],
            ..Default::default()
        });
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::Ineligible(IneligibleReason::NoValidPurchases)));
        assert_eq!(err.to_string(), "Customer has no purchases of more than 6 months");
        assert_eq!(mock.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_pets_is_ineligible() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(7)],
            ..Default::default()
        });
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::Ineligible(IneligibleReason::NoPets)));
        assert_eq!(err.to_string(), "Customer does not have pets");
        assert_eq!(mock.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_propagates_without_write() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            pets: vec![pet("a", "cat")],
            fail_purchases: true,
            ..Default::default()
        });
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::Store(_)));
        assert_eq!(mock.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn eligible_customer_gets_one_of_their_pets() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(7)],
            pets: vec![pet("a", "cat"), pet("b", "dog")],
            ..Default::default()
        });
        let outcome = svc.evaluate_with("1", now(), &mut rng()).await.unwrap();
        let assignment = match outcome {
            GiftOutcome::Assigned(a) => a,
            other => panic!("expected assignment, got {:?}", other),
        };
        let species = assignment.pet.species.clone();
        assert!(species == "cat" || species == "dog");
        assert_eq!(assignment.customer.gift_type.as_deref(), Some(species.as_str()));
        assert_eq!(
            assignment.message(),
            format!("Max Smith: a gift was assigned for his {}", species)
        );
        assert_eq!(mock.writes.load(Ordering::SeqCst), 1);
        assert_eq!(*mock.written.lock().unwrap(), vec![species]);
    }

    #[tokio::test]
    async fn lost_latch_race_reports_already_processed() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(7)],
            pets: vec![pet("a", "cat")],
            assign_result: Some(false),
            ..Default::default()
        });
        let outcome = svc.evaluate_with("1", now(), &mut rng()).await.unwrap();
        assert_eq!(outcome, GiftOutcome::AlreadyProcessed);
        assert_eq!(mock.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn customer_removed_before_write_is_not_found() {
        let (svc, mock) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(7)],
            pets: vec![pet("a", "cat")],
            remove_on_assign: true,
            ..Default::default()
        });
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::NotFound));
        assert_eq!(mock.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_evaluation_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_customer(customer(None)).unwrap();
        store.insert_purchase(purchase(7)).unwrap();
        store.insert_pet(pet("a", "cat")).unwrap();
        store.insert_pet(pet("b", "dog")).unwrap();
        let svc = GiftService::new(Stores::shared(store.clone()));

        let first = svc.evaluate_with("1", now(), &mut rng()).await.unwrap();
        assert!(matches!(first, GiftOutcome::Assigned(_)));
        let second = svc.evaluate_with("1", now(), &mut rng()).await.unwrap();
        assert_eq!(second, GiftOutcome::AlreadyProcessed);
        assert_eq!(store.gift_writes().unwrap(), 1);
    }

    /// Holds every reader of an ungifted customer until all `parties` have read it,
    /// so each caller passes the latch check before anyone writes.
    struct GatedStore {
        inner: Arc<InMemoryStore>,
        gate: Barrier,
    }

    #[async_trait]
    impl CustomerStore for GatedStore {
        async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, StoreError> {
            let found = self.inner.find_by_id(id).await?;
            if found.as_ref().is_some_and(|c| !c.is_gifted()) {
                self.gate.wait().await;
            }
            Ok(found)
        }

        async fn assign_gift(&self, id: &str, gift_type: &str) -> Result<bool, StoreError> {
            self.inner.assign_gift(id, gift_type).await
        }
    }

    #[async_trait]
    impl PurchaseStore for GatedStore {
        async fn valid_purchases(
            &self,
            customer_id: &str,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Purchase>, StoreError> {
            self.inner.valid_purchases(customer_id, cutoff).await
        }
    }

    #[async_trait]
    impl PetStore for GatedStore {
        async fn pets_by_owner(&self, owner_id: &str) -> Result<Vec<Pet>, StoreError> {
            self.inner.pets_by_owner(owner_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_evaluations_record_one_gift() {
        const CALLERS: usize = 4;
        let store = Arc::new(InMemoryStore::new());
        store.insert_customer(customer(None)).unwrap();
        store.insert_purchase(purchase(8)).unwrap();
        store.insert_pet(pet("a", "cat")).unwrap();
        store.insert_pet(pet("b", "dog")).unwrap();
        let gated = Arc::new(GatedStore {
            inner: store.clone(),
            gate: Barrier::new(CALLERS),
        });
        let svc = GiftService::new(Stores::shared(gated));

        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move { svc.evaluate("1").await }));
        }
        let (mut assigned, mut already) = (0, 0);
        for h in handles {
            match h.await.unwrap().unwrap() {
                GiftOutcome::Assigned(_) => assigned += 1,
                GiftOutcome::AlreadyProcessed => already += 1,
            }
        }
        assert_eq!(assigned, 1);
        assert_eq!(already, CALLERS - 1);
        assert_eq!(store.gift_writes().unwrap(), 1);
    }

    /// Collects the `message` field of every event.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.0.lock().unwrap().push(message);
            }
        }
    }

    fn messages_from(mock: MockStore) -> (Result<GiftOutcome, GiftError>, Vec<String>) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let (svc, _) = service(mock);
        let result = tracing::subscriber::with_default(subscriber, || {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(svc.evaluate_with("1", now(), &mut rng()))
        });
        let messages = captured.0.lock().unwrap().clone();
        (result, messages)
    }

    #[test]
    fn every_rejection_logs_its_reason() {
        let (result, messages) = messages_from(MockStore::default());
        assert!(matches!(result, Err(GiftError::NotFound)));
        assert!(messages.iter().any(|m| m == "customer not found"), "{:?}", messages);

        let (result, messages) = messages_from(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(2)],
            pets: vec![pet("a", "cat")],
            ..Default::default()
        });
        assert!(matches!(result, Err(GiftError::Ineligible(IneligibleReason::NoValidPurchases))));
        assert!(messages.iter().any(|m| m == "no purchases older than cutoff"), "{:?}", messages);

        let (result, messages) = messages_from(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(7)],
            ..Default::default()
        });
        assert!(matches!(result, Err(GiftError::Ineligible(IneligibleReason::NoPets))));
        assert!(messages.iter().any(|m| m == "customer has no pets"), "{:?}", messages);
    }

    #[test]
    fn selection_reaches_every_pet_including_the_last() {
        let pets = vec![pet("a", "cat"), pet("b", "dog"), pet("c", "parrot")];
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(select_pet(&pets, &mut rng).unwrap().id.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn selection_of_single_and_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_pet(&[], &mut rng).is_none());
        let one = vec![pet("a", "cat")];
        assert_eq!(select_pet(&one, &mut rng).unwrap().id, "a");
    }

    #[tokio::test]
    async fn purchase_exactly_six_months_old_does_not_count() {
        let (svc, _) = service(MockStore {
            customer: Mutex::new(Some(customer(None))),
            purchases: vec![purchase(6)],
            pets: vec![pet("a", "cat")],
            ..Default::default()
        });
        let err = svc.evaluate_with("1", now(), &mut rng()).await.unwrap_err();
        assert!(matches!(err, GiftError::Ineligible(IneligibleReason::NoValidPurchases)));
    }
}
