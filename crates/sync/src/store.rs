use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rental_agreements_types::{AgreementRecord, AgreementStatus, AgreementTransition, Order};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("conditional update lost for order {0}")]
    Conflict(String),

    #[error("duplicate order ID: {0}")]
    DuplicateId(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection error: {0}")]
    Connection(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Order persistence as seen by the agreement lifecycle. The wider
/// back-office owns the rest of the order; this trait is deliberately
/// limited to the agreement sub-fields plus the reads the sweep and the
/// reminder campaign need.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Look an order up by its current submission reference. Webhooks are
    /// keyed by submission, not order.
    async fn get_by_submission(&self, submission_id: &str) -> Result<Option<Order>, StoreError>;

    /// Conditional write of the agreement sub-record, keyed on the version
    /// read. Returns the new version; `Conflict` when another writer got
    /// there first, in which case the caller re-fetches and re-reconciles.
    async fn update_agreement(
        &self,
        order_id: &str,
        expected_version: u64,
        agreement: &AgreementRecord,
    ) -> Result<u64, StoreError>;

    async fn mark_cancelled(&self, order_id: &str) -> Result<(), StoreError>;

    /// Orders the pull sweep cares about: unsigned, not cancelled, with a
    /// submission reference to poll.
    async fn list_unsigned_with_submission(&self, limit: usize) -> Result<Vec<Order>, StoreError>;

    /// Orders the reminder campaign cares about: unsigned, not cancelled,
    /// no active override, delivery not yet passed (or unscheduled, so the
    /// notifier can flag them).
    async fn list_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError>;

    async fn record_transition(
        &self,
        order_id: &str,
        transition: AgreementTransition,
    ) -> Result<(), StoreError>;

    async fn get_history(&self, order_id: &str) -> Result<Vec<AgreementTransition>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE (for testing)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
    transitions: Arc<RwLock<HashMap<String, Vec<AgreementTransition>>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().unwrap().is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateId(order.id.clone()));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().unwrap().get(id).cloned())
    }

    async fn get_by_submission(&self, submission_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .unwrap()
            .values()
            .find(|o| o.agreement.submission_id.as_deref() == Some(submission_id))
            .cloned())
    }

    async fn update_agreement(
        &self,
        order_id: &str,
        expected_version: u64,
        agreement: &AgreementRecord,
    ) -> Result<u64, StoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;

        if order.version != expected_version {
            return Err(StoreError::Conflict(order_id.to_string()));
        }

        order.agreement = agreement.clone();
        order.version += 1;
        Ok(order.version)
    }

    async fn mark_cancelled(&self, order_id: &str) -> Result<(), StoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;
        order.cancelled = true;
        Ok(())
    }

    async fn list_unsigned_with_submission(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut results: Vec<_> = orders
            .values()
            .filter(|o| {
                !o.cancelled
                    && o.agreement.status != AgreementStatus::Signed
                    && o.agreement.submission_id.is_some()
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        results.truncate(limit);
        Ok(results)
    }

    async fn list_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut results: Vec<_> = orders
            .values()
            .filter(|o| {
                !o.cancelled
                    && o.agreement.status != AgreementStatus::Signed
                    && o.agreement.block_override.is_none()
                    && !o.delivery_passed(now)
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        results.truncate(limit);
        Ok(results)
    }

    async fn record_transition(
        &self,
        order_id: &str,
        transition: AgreementTransition,
    ) -> Result<(), StoreError> {
        if !self.orders.read().unwrap().contains_key(order_id) {
            return Err(StoreError::NotFound(order_id.to_string()));
        }

        self.transitions
            .write()
            .unwrap()
            .entry(order_id.to_string())
            .or_default()
            .push(transition);

        Ok(())
    }

    async fn get_history(&self, order_id: &str) -> Result<Vec<AgreementTransition>, StoreError> {
        Ok(self
            .transitions
            .read()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn test_order(id: &str) -> Order {
        Order::new(id, "jo@example.com", "Jo Doe")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryOrderStore::new();
        let order = test_order("order-1");

        store.create(&order).await.unwrap();
        let fetched = store.get("order-1").await.unwrap();
        assert_eq!(fetched, Some(order));
    }

    #[tokio::test]
    async fn test_get_by_submission() {
        let store = InMemoryOrderStore::new();
        let mut order = test_order("order-1");
        order.agreement.attach_new_submission("sub-1");
        store.create(&order).await.unwrap();

        let found = store.get_by_submission("sub-1").await.unwrap();
        assert_eq!(found.map(|o| o.id), Some("order-1".to_string()));

        assert!(store.get_by_submission("sub-x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryOrderStore::new();
        let order = test_order("order-1");

        store.create(&order).await.unwrap();
        assert!(matches!(
            store.create(&order).await,
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn test_update_agreement_bumps_version() {
        let store = InMemoryOrderStore::new();
        store.create(&test_order("order-1")).await.unwrap();

        let mut agreement = AgreementRecord::new();
        agreement.attach_new_submission("sub-1");

        let new_version = store.update_agreement("order-1", 0, &agreement).await.unwrap();
        assert_eq!(new_version, 1);

        let updated = store.get("order-1").await.unwrap().unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.agreement.submission_id.as_deref(), Some("sub-1"));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = InMemoryOrderStore::new();
        store.create(&test_order("order-1")).await.unwrap();

        let agreement = AgreementRecord::new();
        store.update_agreement("order-1", 0, &agreement).await.unwrap();

        let result = store.update_agreement("order-1", 0, &agreement).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_unsigned_with_submission() {
        let store = InMemoryOrderStore::new();

        let mut with_submission = test_order("order-1");
        with_submission.agreement.attach_new_submission("sub-1");

        let without_submission = test_order("order-2");

        let mut signed = test_order("order-3");
        signed.agreement.attach_new_submission("sub-3");
        signed.agreement.status = AgreementStatus::Signed;

        let mut cancelled = test_order("order-4");
        cancelled.agreement.attach_new_submission("sub-4");
        cancelled.cancelled = true;

        for order in [&with_submission, &without_submission, &signed, &cancelled] {
            store.create(order).await.unwrap();
        }

        let unsigned = store.list_unsigned_with_submission(10).await.unwrap();
        assert_eq!(unsigned.len(), 1);
        assert_eq!(unsigned[0].id, "order-1");
    }

    #[tokio::test]
    async fn test_list_reminder_candidates_excludes_passed_and_overridden() {
        let store = InMemoryOrderStore::new();

        let mut upcoming = test_order("order-1");
        upcoming.delivery_at = Some(ts(5000));

        let mut passed = test_order("order-2");
        passed.delivery_at = Some(ts(100));

        let mut overridden = test_order("order-3");
        overridden.delivery_at = Some(ts(5000));
        overridden.agreement.block_override = Some(rental_agreements_types::BlockOverride {
            reason: "verbal ok".to_string(),
            by: "manager".to_string(),
            at: ts(50),
        });

        // No delivery date - stays in, so the notifier can flag it
        let unscheduled = test_order("order-4");

        for order in [&upcoming, &passed, &overridden, &unscheduled] {
            store.create(order).await.unwrap();
        }

        let candidates = store.list_reminder_candidates(ts(1000), 10).await.unwrap();
        let ids: Vec<_> = candidates.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["order-1", "order-4"]);
    }

    #[tokio::test]
    async fn test_transition_history() {
        let store = InMemoryOrderStore::new();
        store.create(&test_order("order-1")).await.unwrap();

        let transition = AgreementTransition::new(
            AgreementStatus::NotSent,
            AgreementStatus::Pending,
            ts(100),
        )
        .with_details("submission opened");

        store.record_transition("order-1", transition.clone()).await.unwrap();

        let history = store.get_history("order-1").await.unwrap();
        assert_eq!(history, vec![transition]);

        assert!(matches!(
            store
                .record_transition("missing", AgreementTransition::new(
                    AgreementStatus::NotSent,
                    AgreementStatus::Pending,
                    ts(100),
                ))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }
}
