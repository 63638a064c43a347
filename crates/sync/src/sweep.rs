use rental_agreements_provider::{EsignClient, SubmissionManager};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::reconcile::Effect;
use crate::store::OrderStore;
use crate::synchronizer::Synchronizer;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum orders examined per run
    pub batch_limit: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { batch_limit: 200 }
    }
}

/// Effects produced for one order during a sweep, for the caller to act on
#[derive(Debug)]
pub struct SweepOutcome {
    pub order_id: String,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub examined: usize,
    pub reconciled: usize,
    pub unchanged: usize,
    pub flagged_stale: usize,
    pub errors: usize,
    pub outcomes: Vec<SweepOutcome>,
}

/// The pull half of reconciliation: periodically polls every unsigned order
/// that has a submission reference. This is the self-healing path for
/// missed or malformed webhooks, and the only path for orders whose
/// submission never produced one.
pub struct Sweep<S, C> {
    store: Arc<S>,
    synchronizer: Arc<Synchronizer<S>>,
    manager: Arc<SubmissionManager<C>>,
    config: SweepConfig,
}

impl<S: OrderStore, C: EsignClient> Sweep<S, C> {
    pub fn new(
        store: Arc<S>,
        synchronizer: Arc<Synchronizer<S>>,
        manager: Arc<SubmissionManager<C>>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            synchronizer,
            manager,
            config,
        }
    }

    /// One full pass. Per-order failures are reported and the sweep moves
    /// on; only a store failure listing the batch aborts the run.
    pub async fn run(&self) -> Result<SweepReport, SyncError> {
        let orders = self
            .store
            .list_unsigned_with_submission(self.config.batch_limit)
            .await?;

        let mut report = SweepReport::default();

        for order in orders {
            report.examined += 1;

            let Some(submission_id) = order.agreement.submission_id.clone() else {
                continue;
            };

            match self.manager.fetch_status(&submission_id).await {
                Ok(submission) => match self.synchronizer.apply(&order.id, &submission).await {
                    Ok(applied) if applied.changed => {
                        report.reconciled += 1;
                        if !applied.effects.is_empty() {
                            report.outcomes.push(SweepOutcome {
                                order_id: order.id.clone(),
                                effects: applied.effects,
                            });
                        }
                    }
                    Ok(_) => report.unchanged += 1,
                    Err(e) => {
                        warn!(order_id = %order.id, error = %e, "sweep reconcile failed");
                        report.errors += 1;
                    }
                },
                Err(e) if e.is_not_found() => {
                    // Reported, never fatal: flag for recreation and move on.
                    if let Err(flag_err) = self.synchronizer.flag_stale_submission(&order.id).await
                    {
                        warn!(
                            order_id = %order.id,
                            error = %flag_err,
                            "failed to flag stale submission"
                        );
                        report.errors += 1;
                    } else {
                        report.flagged_stale += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        order_id = %order.id,
                        submission_id = %submission_id,
                        error = %e,
                        "sweep fetch failed"
                    );
                    report.errors += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                reconciled = report.reconciled,
                flagged_stale = report.flagged_stale,
                errors = report.errors,
                "agreement sweep complete"
            );
        } else {
            debug!("agreement sweep found nothing to poll");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rental_agreements_provider::{CreateSubmissionRequest, ProviderError};
    use rental_agreements_types::{
        AgreementStatus, Order, Submission, Submitter, SubmitterStatus,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Provider stub keyed by submission ID; unknown IDs answer 404.
    #[derive(Default)]
    struct StubProvider {
        submissions: Mutex<HashMap<String, Submission>>,
    }

    impl StubProvider {
        fn insert(&self, submission: Submission) {
            self.submissions
                .lock()
                .unwrap()
                .insert(submission.id.clone(), submission);
        }
    }

    #[async_trait]
    impl EsignClient for StubProvider {
        async fn create_submission(
            &self,
            _request: &CreateSubmissionRequest,
        ) -> Result<Submission, ProviderError> {
            unimplemented!("sweep never creates submissions")
        }

        async fn fetch_submission(&self, submission_id: &str) -> Result<Submission, ProviderError> {
            self.submissions
                .lock()
                .unwrap()
                .get(submission_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(submission_id.to_string()))
        }

        async fn void_submission(&self, _submission_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn submission(id: &str, status: SubmitterStatus) -> Submission {
        Submission {
            id: id.to_string(),
            submitters: vec![Submitter {
                email: "jo@example.com".to_string(),
                name: None,
                status,
                signing_url: None,
                opened_at: None,
                completed_at: matches!(status, SubmitterStatus::Completed).then(Utc::now),
                declined_at: None,
            }],
            created_at: None,
        }
    }

    async fn seed_order(store: &InMemoryOrderStore, id: &str, submission_id: &str) {
        let mut order = Order::new(id, "jo@example.com", "Jo Doe");
        order.agreement.attach_new_submission(submission_id);
        store.create(&order).await.unwrap();
    }

    fn build_sweep(
        store: Arc<InMemoryOrderStore>,
        provider: StubProvider,
    ) -> Sweep<InMemoryOrderStore, StubProvider> {
        let synchronizer = Arc::new(Synchronizer::new(store.clone()));
        let manager = Arc::new(SubmissionManager::new(provider, "tpl-1"));
        Sweep::new(store, synchronizer, manager, SweepConfig::default())
    }

    #[tokio::test]
    async fn test_sweep_reconciles_completed() {
        let store = Arc::new(InMemoryOrderStore::new());
        seed_order(&store, "order-1", "sub-1").await;

        let provider = StubProvider::default();
        provider.insert(submission("sub-1", SubmitterStatus::Completed));

        let sweep = build_sweep(store.clone(), provider);
        let report = sweep.run().await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].effects, vec![Effect::ConfirmationDue]);

        let order = store.get("order-1").await.unwrap().unwrap();
        assert_eq!(order.agreement.status, AgreementStatus::Signed);
        assert!(!order.agreement.delivery_blocked);
    }

    #[tokio::test]
    async fn test_sweep_flags_stale_and_continues() {
        let store = Arc::new(InMemoryOrderStore::new());
        seed_order(&store, "order-1", "sub-gone").await;
        seed_order(&store, "order-2", "sub-2").await;

        let provider = StubProvider::default();
        provider.insert(submission("sub-2", SubmitterStatus::Opened));

        let sweep = build_sweep(store.clone(), provider);
        let report = sweep.run().await.unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.flagged_stale, 1);
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.errors, 0);

        let stale = store.get("order-1").await.unwrap().unwrap();
        assert!(stale.agreement.submission_id.is_none());
        assert!(stale.agreement.needs_new_submission);

        let viewed = store.get("order-2").await.unwrap().unwrap();
        assert_eq!(viewed.agreement.status, AgreementStatus::Viewed);
    }

    #[tokio::test]
    async fn test_sweep_noop_when_state_already_correct() {
        let store = Arc::new(InMemoryOrderStore::new());
        seed_order(&store, "order-1", "sub-1").await;

        let provider = StubProvider::default();
        provider.insert(submission("sub-1", SubmitterStatus::Sent));

        let sweep = build_sweep(store.clone(), provider);
        let report = sweep.run().await.unwrap();

        assert_eq!(report.unchanged, 1);
        assert!(report.outcomes.is_empty());
    }
}
