use chrono::Utc;
use rental_agreements_types::{AgreementStatus, AgreementTransition, Order, Submission};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::reconcile::{reconcile, Effect};
use crate::store::{OrderStore, StoreError};

/// Outcome of applying a remote snapshot to an order
#[derive(Debug)]
pub struct Applied {
    pub changed: bool,
    pub effects: Vec<Effect>,
    pub order: Order,
}

/// Applies reconciliations through the store's compare-and-set. Shared by
/// the webhook path and the pull sweep; safe to run redundantly because the
/// underlying reconcile is idempotent and a lost race is retried against
/// fresh state.
pub struct Synchronizer<S> {
    store: Arc<S>,
    max_conflict_retries: u32,
}

impl<S: OrderStore> Synchronizer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_conflict_retries: 3,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Reconcile one order against a submission snapshot and persist the
    /// result. Either the whole reconciliation lands or none of it does.
    pub async fn apply(
        &self,
        order_id: &str,
        submission: &Submission,
    ) -> Result<Applied, SyncError> {
        for attempt in 0..=self.max_conflict_retries {
            let mut order = self
                .store
                .get(order_id)
                .await?
                .ok_or_else(|| SyncError::OrderNotFound(order_id.to_string()))?;

            let result = reconcile(&order.agreement, submission, Utc::now());
            if !result.changed {
                debug!(order_id = %order_id, "reconciliation is a no-op");
                return Ok(Applied {
                    changed: false,
                    effects: Vec::new(),
                    order,
                });
            }

            match self
                .store
                .update_agreement(order_id, order.version, &result.record)
                .await
            {
                Ok(new_version) => {
                    self.record_audit(order_id, &order.agreement.status, &result)
                        .await;

                    info!(
                        order_id = %order_id,
                        submission_id = %submission.id,
                        from = order.agreement.status.as_str(),
                        to = result.record.status.as_str(),
                        "agreement reconciled"
                    );

                    order.agreement = result.record;
                    order.version = new_version;
                    return Ok(Applied {
                        changed: true,
                        effects: result.effects,
                        order,
                    });
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(
                        order_id = %order_id,
                        attempt = attempt + 1,
                        "lost conditional update race, re-reconciling"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SyncError::Conflict(order_id.to_string()))
    }

    /// Mark an order whose stored submission reference turned out stale
    /// (404 on fetch). The reference is dropped - a submission ID that
    /// 404s is absent, not cached as valid - and the next reminder cycle
    /// opens a fresh submission.
    pub async fn flag_stale_submission(&self, order_id: &str) -> Result<(), SyncError> {
        for _ in 0..=self.max_conflict_retries {
            let order = self
                .store
                .get(order_id)
                .await?
                .ok_or_else(|| SyncError::OrderNotFound(order_id.to_string()))?;

            let mut record = order.agreement.clone();
            record.submission_id = None;
            record.needs_new_submission = true;

            if record == order.agreement {
                return Ok(());
            }

            match self
                .store
                .update_agreement(order_id, order.version, &record)
                .await
            {
                Ok(_) => {
                    warn!(order_id = %order_id, "dropped stale submission reference");
                    return Ok(());
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(SyncError::Conflict(order_id.to_string()))
    }

    async fn record_audit(
        &self,
        order_id: &str,
        from: &AgreementStatus,
        result: &crate::reconcile::Reconciliation,
    ) {
        // The audit keeps the decline visible even though the persisted
        // status is normalized to pending.
        let (to_status, details) = if result.effects.contains(&Effect::NewSubmissionNeeded) {
            (
                AgreementStatus::Declined,
                Some("decline normalized to pending; fresh submission required".to_string()),
            )
        } else if result.effects.contains(&Effect::ConfirmationDue) {
            (
                result.record.status,
                Some("all recipients completed".to_string()),
            )
        } else {
            (result.record.status, None)
        };

        let mut transition = AgreementTransition::new(*from, to_status, Utc::now());
        if let Some(details) = details {
            transition = transition.with_details(details);
        }

        // Audit failure must not unwind an already-applied reconciliation.
        if let Err(e) = self.store.record_transition(order_id, transition).await {
            warn!(order_id = %order_id, error = %e, "failed to record audit transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderStore;
    use rental_agreements_types::{Submitter, SubmitterStatus};

    fn completed_submission(id: &str) -> Submission {
        Submission {
            id: id.to_string(),
            submitters: vec![Submitter {
                email: "jo@example.com".to_string(),
                name: None,
                status: SubmitterStatus::Completed,
                signing_url: None,
                opened_at: None,
                completed_at: Some(Utc::now()),
                declined_at: None,
            }],
            created_at: None,
        }
    }

    async fn seeded_store() -> Arc<InMemoryOrderStore> {
        let store = Arc::new(InMemoryOrderStore::new());
        let mut order = Order::new("order-1", "jo@example.com", "Jo Doe");
        order.agreement.attach_new_submission("sub-1");
        store.create(&order).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_apply_signs_once() {
        let store = seeded_store().await;
        let synchronizer = Synchronizer::new(store.clone());
        let submission = completed_submission("sub-1");

        let first = synchronizer.apply("order-1", &submission).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.effects, vec![Effect::ConfirmationDue]);
        assert_eq!(first.order.agreement.status, AgreementStatus::Signed);

        // Redelivery of the same payload is a no-op with no effects
        let second = synchronizer.apply("order-1", &submission).await.unwrap();
        assert!(!second.changed);
        assert!(second.effects.is_empty());
    }

    #[tokio::test]
    async fn test_apply_records_audit() {
        let store = seeded_store().await;
        let synchronizer = Synchronizer::new(store.clone());

        synchronizer
            .apply("order-1", &completed_submission("sub-1"))
            .await
            .unwrap();

        let history = store.get_history("order-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, AgreementStatus::Pending);
        assert_eq!(history[0].to_status, AgreementStatus::Signed);
    }

    #[tokio::test]
    async fn test_decline_audit_shows_decline() {
        let store = seeded_store().await;
        let synchronizer = Synchronizer::new(store.clone());

        let mut submission = completed_submission("sub-1");
        submission.submitters[0].status = SubmitterStatus::Declined;
        submission.submitters[0].completed_at = None;

        let applied = synchronizer.apply("order-1", &submission).await.unwrap();
        assert_eq!(applied.effects, vec![Effect::NewSubmissionNeeded]);
        assert_eq!(applied.order.agreement.status, AgreementStatus::Pending);

        let history = store.get_history("order-1").await.unwrap();
        assert_eq!(history[0].to_status, AgreementStatus::Declined);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let synchronizer = Synchronizer::new(store);

        let result = synchronizer
            .apply("order-x", &completed_submission("sub-1"))
            .await;
        assert!(matches!(result, Err(SyncError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_flag_stale_submission() {
        let store = seeded_store().await;
        let synchronizer = Synchronizer::new(store.clone());

        synchronizer.flag_stale_submission("order-1").await.unwrap();

        let order = store.get("order-1").await.unwrap().unwrap();
        assert!(order.agreement.submission_id.is_none());
        assert!(order.agreement.needs_new_submission);

        // Second call is a no-op, not a version bump
        let version = order.version;
        synchronizer.flag_stale_submission("order-1").await.unwrap();
        let order = store.get("order-1").await.unwrap().unwrap();
        assert_eq!(order.version, version);
    }

    #[tokio::test]
    async fn test_concurrent_apply_single_transition() {
        let store = seeded_store().await;
        let synchronizer = Arc::new(Synchronizer::new(store.clone()));
        let submission = completed_submission("sub-1");

        let a = {
            let synchronizer = synchronizer.clone();
            let submission = submission.clone();
            tokio::spawn(async move { synchronizer.apply("order-1", &submission).await })
        };
        let b = {
            let synchronizer = synchronizer.clone();
            let submission = submission.clone();
            tokio::spawn(async move { synchronizer.apply("order-1", &submission).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        // Exactly one invocation observes the transition
        assert_eq!(
            [a.changed, b.changed].iter().filter(|c| **c).count(),
            1,
            "exactly one racer should apply the change"
        );

        let confirmations = a
            .effects
            .iter()
            .chain(b.effects.iter())
            .filter(|e| **e == Effect::ConfirmationDue)
            .count();
        assert_eq!(confirmations, 1);
    }
}
