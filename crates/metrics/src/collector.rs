use std::time::Duration;

use prometheus::{Encoder, Registry, TextEncoder};
use rental_agreements_types::{AgreementStatus, ReminderTier};
use thiserror::Error;

use crate::metrics::*;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to encode metrics: {0}")]
    EncodeError(String),
}

/// Metrics collector for the rental agreement service
pub struct MetricsCollector {
    registry: Registry,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Self {
        let registry = Registry::new();
        Self { registry }
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUBMISSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_submission_created(&self) {
        SUBMISSIONS_CREATED.inc();
        AWAITING_SIGNATURE.inc();
    }

    pub fn record_submission_reused(&self) {
        SUBMISSIONS_REUSED.inc();
    }

    pub fn record_submission_stale(&self) {
        SUBMISSIONS_STALE.inc();
    }

    pub fn record_submission_voided(&self) {
        SUBMISSIONS_VOIDED.inc();
    }

    pub fn record_provider_call(&self, duration: Duration) {
        PROVIDER_CALL_LATENCY.observe(duration.as_millis() as f64);
    }

    pub fn record_provider_error(&self, kind: &str) {
        PROVIDER_ERRORS.with_label_values(&[kind]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WEBHOOK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_webhook_received(&self) {
        WEBHOOKS_RECEIVED.inc();
    }

    pub fn record_webhook_rejected(&self) {
        WEBHOOKS_REJECTED.inc();
    }

    pub fn record_webhook_malformed(&self) {
        WEBHOOKS_MALFORMED.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECONCILIATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a reconciliation outcome and the status it landed on
    pub fn record_reconcile(&self, changed: bool, status: AgreementStatus) {
        if changed {
            RECONCILE_APPLIED.inc();
            AGREEMENT_STATUS_COUNT
                .with_label_values(&[status.as_str()])
                .inc();

            if status == AgreementStatus::Signed {
                AGREEMENTS_SIGNED.inc();
                AWAITING_SIGNATURE.dec();
            }
        } else {
            RECONCILE_NOOP.inc();
        }
    }

    pub fn record_reconcile_conflict(&self) {
        RECONCILE_CONFLICTS.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REMINDER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_reminder_sent(&self, tier: ReminderTier) {
        REMINDERS_SENT.with_label_values(&[tier.as_str()]).inc();
    }

    pub fn record_reminder_skipped(&self, reason: &str) {
        REMINDERS_SKIPPED.with_label_values(&[reason]).inc();
    }

    pub fn record_reminder_send_failure(&self) {
        REMINDER_SEND_FAILURES.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SWEEP METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_sweep(&self, duration: Duration, errors: usize) {
        SWEEP_RUNS.inc();
        SWEEP_DURATION.observe(duration.as_millis() as f64);
        for _ in 0..errors {
            SWEEP_ERRORS.inc();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GATE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_gate_override(&self) {
        GATE_OVERRIDES.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export all metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();

        // Registered metrics live in the default registry; custom registry
        // metrics are appended when present.
        let mut families = prometheus::gather();
        families.extend(self.registry.gather());

        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::EncodeError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodeError(e.to_string()))
    }
}
