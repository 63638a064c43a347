use chrono::Utc;
use rental_agreements_gate::{can_deliver, DeliveryGate, GateError};
use rental_agreements_metrics::MetricsCollector;
use rental_agreements_notify::{
    EscalationNotifier, Mailer, SkipReason, TickDecision, TickOutcome,
};
use rental_agreements_provider::{
    parse_event, verify_signature, EsignClient, ProviderError, SubmissionManager, WebhookError,
};
use rental_agreements_sync::{
    Effect, OrderStore, StoreError, Sweep, SweepConfig, SweepReport, SyncError, Synchronizer,
};
use rental_agreements_types::{AgreementRecord, Order, ReminderTier};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-tick order limit for the reminder campaign
    pub reminder_batch_limit: usize,

    /// Per-run order limit for the status sweep
    pub sweep_batch_limit: usize,

    /// Always open a fresh submission after a decline
    pub recreate_after_decline: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            reminder_batch_limit: 200,
            sweep_batch_limit: 200,
            recreate_after_decline: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order is cancelled: {0}")]
    OrderCancelled(String),

    #[error("conditional update kept losing for order {0}, giving up")]
    Conflict(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("gate error: {0}")]
    Gate(#[from] GateError),
}

/// Failure modes of the webhook entry point, mapped onto HTTP statuses by
/// the router.
#[derive(Debug, Error)]
pub enum WebhookHandleError {
    #[error("webhook signature missing or invalid")]
    Unauthorized,

    #[error("malformed webhook payload: {0}")]
    Malformed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Builder error
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

// ═══════════════════════════════════════════════════════════════════════════
// REPORTS
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ReminderReport {
    pub examined: usize,
    pub sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Builder for AgreementOrchestrator
pub struct AgreementOrchestratorBuilder<C, S, M>
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    store: Option<Arc<S>>,
    manager: Option<SubmissionManager<C>>,
    notifier: Option<EscalationNotifier<M>>,
    webhook_secret: Option<String>,
    collector: Option<Arc<MetricsCollector>>,
    config: OrchestratorConfig,
}

impl<C, S, M> AgreementOrchestratorBuilder<C, S, M>
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            store: None,
            manager: None,
            notifier: None,
            webhook_secret: None,
            collector: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Set the order store
    pub fn with_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the submission manager
    pub fn with_submission_manager(mut self, manager: SubmissionManager<C>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Set the escalation notifier
    pub fn with_notifier(mut self, notifier: EscalationNotifier<M>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the webhook shared secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Set the metrics collector
    pub fn with_collector(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Set the orchestrator configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator, validating that all required fields are set
    pub fn build(self) -> Result<AgreementOrchestrator<C, S, M>, BuilderError> {
        let store = self.store.ok_or_else(|| BuilderError::MissingField {
            field: "store".to_string(),
        })?;

        let manager = self.manager.ok_or_else(|| BuilderError::MissingField {
            field: "manager".to_string(),
        })?;

        let notifier = self.notifier.ok_or_else(|| BuilderError::MissingField {
            field: "notifier".to_string(),
        })?;

        let webhook_secret = self.webhook_secret.ok_or_else(|| BuilderError::MissingField {
            field: "webhook_secret".to_string(),
        })?;

        let collector = self
            .collector
            .unwrap_or_else(|| Arc::new(MetricsCollector::new()));

        Ok(AgreementOrchestrator::new(
            store,
            manager,
            notifier,
            webhook_secret,
            collector,
            self.config,
        ))
    }
}

impl<C, S, M> Default for AgreementOrchestratorBuilder<C, S, M>
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Composition root of the agreement lifecycle: wires the submission
/// manager, synchronizer, notifier and gate around one order store, and
/// exposes the four external entry points (webhook, sweep, reminder tick,
/// admin commands). Explicitly constructed; no ambient state.
pub struct AgreementOrchestrator<C, S, M>
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    store: Arc<S>,
    manager: Arc<SubmissionManager<C>>,
    synchronizer: Arc<Synchronizer<S>>,
    sweep: Sweep<S, C>,
    notifier: EscalationNotifier<M>,
    gate: DeliveryGate<S>,
    collector: Arc<MetricsCollector>,
    webhook_secret: String,
    config: OrchestratorConfig,
}

impl<C, S, M> AgreementOrchestrator<C, S, M>
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        store: Arc<S>,
        manager: SubmissionManager<C>,
        notifier: EscalationNotifier<M>,
        webhook_secret: String,
        collector: Arc<MetricsCollector>,
        config: OrchestratorConfig,
    ) -> Self {
        let manager = Arc::new(manager);
        let synchronizer = Arc::new(Synchronizer::new(store.clone()));
        let sweep = Sweep::new(
            store.clone(),
            synchronizer.clone(),
            manager.clone(),
            SweepConfig {
                batch_limit: config.sweep_batch_limit,
            },
        );
        let gate = DeliveryGate::new(store.clone());

        Self {
            store,
            manager,
            synchronizer,
            sweep,
            notifier,
            gate,
            collector,
            webhook_secret,
            config,
        }
    }

    pub fn builder() -> AgreementOrchestratorBuilder<C, S, M> {
        AgreementOrchestratorBuilder::new()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // AGREEMENT LIFECYCLE ENTRY POINTS
    // ═══════════════════════════════════════════════════════════════════════

    /// Kick off the agreement cycle for a new order: open (or reuse) a
    /// submission and send the initial email with the signing link.
    pub async fn start_agreement(&self, order_id: &str) -> Result<(), OrchestratorError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.to_string()))?;

        if order.cancelled {
            return Err(OrchestratorError::OrderCancelled(order_id.to_string()));
        }

        self.advance_reminder(order).await?;
        Ok(())
    }

    /// Push path: an inbound provider webhook. The signature is verified
    /// over the raw body before anything is parsed or trusted.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> Result<(), WebhookHandleError> {
        self.collector.record_webhook_received();

        let signature = signature.ok_or_else(|| {
            self.collector.record_webhook_rejected();
            WebhookHandleError::Unauthorized
        })?;

        if let Err(e) = verify_signature(self.webhook_secret.as_bytes(), raw_body, signature) {
            self.collector.record_webhook_rejected();
            return Err(match e {
                WebhookError::InvalidSignature | WebhookError::MalformedSignature(_) => {
                    WebhookHandleError::Unauthorized
                }
                WebhookError::Malformed(msg) => WebhookHandleError::Malformed(msg),
            });
        }

        let event = parse_event(raw_body).map_err(|e| {
            self.collector.record_webhook_malformed();
            WebhookHandleError::Malformed(e.to_string())
        })?;

        let order = self
            .store
            .get_by_submission(&event.submission.id)
            .await
            .map_err(|e| WebhookHandleError::Internal(e.to_string()))?;

        let Some(order) = order else {
            // Webhooks for unknown or already-replaced submissions are
            // acknowledged so the provider stops redelivering them.
            warn!(
                submission_id = %event.submission.id,
                event_type = %event.event_type,
                "webhook for unknown submission, acknowledging"
            );
            return Ok(());
        };

        debug!(
            order_id = %order.id,
            submission_id = %event.submission.id,
            event_type = %event.event_type,
            "processing webhook"
        );

        let applied = self
            .synchronizer
            .apply(&order.id, &event.submission)
            .await
            .map_err(|e| WebhookHandleError::Internal(e.to_string()))?;

        self.collector
            .record_reconcile(applied.changed, applied.order.agreement.status);

        self.run_effects(&applied.order.id, &applied.effects).await;
        Ok(())
    }

    /// Pull path: poll every unsigned order with a submission reference.
    /// Self-healing for missed or malformed webhooks.
    pub async fn run_sweep(&self) -> Result<SweepReport, OrchestratorError> {
        let started = Instant::now();
        let report = self.sweep.run().await?;
        self.collector.record_sweep(started.elapsed(), report.errors);

        for outcome in &report.outcomes {
            self.run_effects(&outcome.order_id, &outcome.effects).await;
        }

        Ok(report)
    }

    /// One pass of the escalating reminder campaign.
    pub async fn run_reminder_tick(&self) -> Result<ReminderReport, OrchestratorError> {
        let now = Utc::now();
        let orders = self
            .store
            .list_reminder_candidates(now, self.config.reminder_batch_limit)
            .await?;

        let mut report = ReminderReport::default();

        for order in orders {
            report.examined += 1;

            match self.advance_reminder(order.clone()).await {
                Ok(Some(tier)) => {
                    report.sent += 1;
                    self.collector.record_reminder_sent(tier);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "reminder tick failed for order");
                    report.errors += 1;
                }
            }
        }

        if report.sent > 0 || report.errors > 0 {
            info!(
                examined = report.examined,
                sent = report.sent,
                errors = report.errors,
                "reminder tick complete"
            );
        }

        Ok(report)
    }

    /// Cancel the agreement side of an order: void the submission at the
    /// provider (best-effort) and stop all further reminders.
    pub async fn cancel_agreement(&self, order_id: &str) -> Result<(), OrchestratorError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.to_string()))?;

        self.store.mark_cancelled(order_id).await?;

        if let Some(submission_id) = &order.agreement.submission_id {
            // Void failure never blocks the cancellation itself.
            if self.manager.void(submission_id).await.is_ok() {
                self.collector.record_submission_voided();
            }
        }

        info!(order_id = %order_id, "agreement cancelled");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DELIVERY GATE
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether dispatch may load this order onto a truck.
    pub async fn can_deliver(&self, order_id: &str) -> Result<bool, OrchestratorError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.to_string()))?;

        Ok(can_deliver(&order))
    }

    /// Audited manual release of the delivery block.
    pub async fn override_block(
        &self,
        order_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Order, OrchestratorError> {
        let order = self.gate.override_block(order_id, reason, actor).await?;
        self.collector.record_gate_override();
        Ok(order)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════

    /// Make sure the order has a live submission when one is needed, then
    /// run one reminder tick for it. Returns the tier sent, if any.
    async fn advance_reminder(
        &self,
        mut order: Order,
    ) -> Result<Option<ReminderTier>, OrchestratorError> {
        let now = Utc::now();

        // Decide before any provider I/O; most orders are not due. A
        // decline-flagged order goes through anyway: its cycle restarts
        // once the fresh submission exists, even though the stale tier
        // reads as not-due right now.
        if let TickDecision::Skip(reason) = self.notifier.decide(&order, now) {
            if !order.agreement.needs_new_submission
                || matches!(reason, SkipReason::Cancelled | SkipReason::AlreadySigned)
            {
                self.collector.record_reminder_skipped(reason.as_str());
                return Ok(None);
            }
        }

        // A declined cycle forces a fresh submission under the default
        // policy; otherwise the stored reference is reused when still live.
        let force_new =
            order.agreement.needs_new_submission && self.config.recreate_after_decline;
        let existing_id = if force_new {
            None
        } else {
            order.agreement.submission_id.clone()
        };

        let outcome = self
            .manager
            .create_or_reuse(&order, existing_id.as_deref())
            .await?;

        if outcome.created {
            let submission_id = outcome.submission.id.clone();
            order = self
                .persist_agreement(&order.id, |record| {
                    record.attach_new_submission(submission_id.clone());
                })
                .await?;
            self.collector.record_submission_created();
        } else if order.agreement.needs_new_submission {
            // Reuse-after-decline policy: same submission, restarted cycle.
            order = self
                .persist_agreement(&order.id, |record| {
                    record.needs_new_submission = false;
                    record.last_reminder_tier = ReminderTier::None;
                    record.last_reminder_sent_at = None;
                })
                .await?;
            self.collector.record_submission_reused();
        } else {
            self.collector.record_submission_reused();
        }

        let signing_url = self
            .manager
            .signing_url_for(&outcome.submission, &order.customer_email)
            .ok();

        match self
            .notifier
            .run_tick(&order, signing_url.as_deref(), now)
            .await
        {
            Ok(TickOutcome::Sent(tier)) => {
                self.persist_agreement(&order.id, |record| {
                    record.last_reminder_tier = tier;
                    record.last_reminder_sent_at = Some(now);
                })
                .await?;
                Ok(Some(tier))
            }
            Ok(TickOutcome::Skipped(reason)) => {
                self.collector.record_reminder_skipped(reason.as_str());
                Ok(None)
            }
            Err(e) => {
                // Tier not persisted: the next tick retries the same tier.
                self.collector.record_reminder_send_failure();
                warn!(order_id = %order.id, error = %e, "reminder send failed");
                Ok(None)
            }
        }
    }

    /// Act on the effects an applied reconciliation produced. Notification
    /// failures are logged and never unwind the reconciliation.
    async fn run_effects(&self, order_id: &str, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::ConfirmationDue => self.send_confirmation(order_id).await,
                Effect::NewSubmissionNeeded => {
                    // Nothing immediate: the next reminder tick opens the
                    // fresh submission and restarts the cycle.
                    debug!(order_id = %order_id, "fresh submission queued for next reminder tick");
                }
            }
        }
    }

    async fn send_confirmation(&self, order_id: &str) {
        let order = match self.store.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_id = %order_id, "order vanished before confirmation send");
                return;
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "failed to load order for confirmation");
                return;
            }
        };

        match self.notifier.send_signed_confirmation(&order).await {
            Ok(Some(tier)) => {
                self.collector.record_reminder_sent(tier);
                if let Err(e) = self
                    .persist_agreement(order_id, |record| {
                        record.last_reminder_tier = tier;
                    })
                    .await
                {
                    warn!(order_id = %order_id, error = %e, "failed to persist confirmation tier");
                }
            }
            Ok(None) => {}
            Err(e) => {
                // Retried by the next sweep finding the tier unset.
                self.collector.record_reminder_send_failure();
                warn!(order_id = %order_id, error = %e, "confirmation send failed");
            }
        }
    }

    /// Apply a mutation to the agreement record through the store's
    /// compare-and-set, retrying lost races against fresh state.
    async fn persist_agreement<F>(
        &self,
        order_id: &str,
        mutate: F,
    ) -> Result<Order, OrchestratorError>
    where
        F: Fn(&mut AgreementRecord),
    {
        for _ in 0..=3 {
            let mut order = self
                .store
                .get(order_id)
                .await?
                .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.to_string()))?;

            let mut record = order.agreement.clone();
            mutate(&mut record);

            if record == order.agreement {
                return Ok(order);
            }

            match self
                .store
                .update_agreement(order_id, order.version, &record)
                .await
            {
                Ok(new_version) => {
                    order.agreement = record;
                    order.version = new_version;
                    return Ok(order);
                }
                Err(StoreError::Conflict(_)) => {
                    self.collector.record_reconcile_conflict();
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(OrchestratorError::Conflict(order_id.to_string()))
    }
}
