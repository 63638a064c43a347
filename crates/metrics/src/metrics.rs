use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // SUBMISSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of signing submissions created
    pub static ref SUBMISSIONS_CREATED: IntCounter = register_int_counter!(
        "rental_agreements_submissions_created_total",
        "Total number of signing submissions created"
    )
    .unwrap();

    /// Total number of existing submissions reused
    pub static ref SUBMISSIONS_REUSED: IntCounter = register_int_counter!(
        "rental_agreements_submissions_reused_total",
        "Total number of existing submissions reused instead of recreated"
    )
    .unwrap();

    /// Total number of stale submission references dropped after a 404
    pub static ref SUBMISSIONS_STALE: IntCounter = register_int_counter!(
        "rental_agreements_submissions_stale_total",
        "Total number of stale submission references dropped"
    )
    .unwrap();

    /// Total number of submissions voided on cancellation
    pub static ref SUBMISSIONS_VOIDED: IntCounter = register_int_counter!(
        "rental_agreements_submissions_voided_total",
        "Total number of submissions voided"
    )
    .unwrap();

    /// Provider call latency histogram (in milliseconds)
    pub static ref PROVIDER_CALL_LATENCY: Histogram = register_histogram!(
        "rental_agreements_provider_call_latency_ms",
        "E-sign provider call latency in milliseconds",
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Provider call failures by error kind
    pub static ref PROVIDER_ERRORS: IntCounterVec = register_int_counter_vec!(
        "rental_agreements_provider_errors_total",
        "Total provider call failures by error kind",
        &["kind"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // WEBHOOK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of webhook callbacks received
    pub static ref WEBHOOKS_RECEIVED: IntCounter = register_int_counter!(
        "rental_agreements_webhooks_received_total",
        "Total number of webhook callbacks received"
    )
    .unwrap();

    /// Total number of webhooks rejected for a bad signature
    pub static ref WEBHOOKS_REJECTED: IntCounter = register_int_counter!(
        "rental_agreements_webhooks_rejected_total",
        "Total number of webhooks rejected for a bad signature"
    )
    .unwrap();

    /// Total number of malformed webhook payloads
    pub static ref WEBHOOKS_MALFORMED: IntCounter = register_int_counter!(
        "rental_agreements_webhooks_malformed_total",
        "Total number of malformed webhook payloads"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // RECONCILIATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total reconciliations that changed local state
    pub static ref RECONCILE_APPLIED: IntCounter = register_int_counter!(
        "rental_agreements_reconcile_applied_total",
        "Total reconciliations that changed local state"
    )
    .unwrap();

    /// Total reconciliations that were no-ops
    pub static ref RECONCILE_NOOP: IntCounter = register_int_counter!(
        "rental_agreements_reconcile_noop_total",
        "Total reconciliations that changed nothing"
    )
    .unwrap();

    /// Total conditional-update races lost and retried
    pub static ref RECONCILE_CONFLICTS: IntCounter = register_int_counter!(
        "rental_agreements_reconcile_conflicts_total",
        "Total conditional-update races lost during reconciliation"
    )
    .unwrap();

    /// Agreement status transitions by resulting status
    pub static ref AGREEMENT_STATUS_COUNT: IntCounterVec = register_int_counter_vec!(
        "rental_agreements_agreement_status_total",
        "Total agreement transitions by resulting status",
        &["status"]
    )
    .unwrap();

    /// Total agreements signed
    pub static ref AGREEMENTS_SIGNED: IntCounter = register_int_counter!(
        "rental_agreements_agreements_signed_total",
        "Total agreements signed"
    )
    .unwrap();

    /// Current number of orders awaiting signature
    pub static ref AWAITING_SIGNATURE: IntGauge = register_int_gauge!(
        "rental_agreements_awaiting_signature",
        "Current number of orders awaiting signature"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // REMINDER METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Reminders sent by tier
    pub static ref REMINDERS_SENT: IntCounterVec = register_int_counter_vec!(
        "rental_agreements_reminders_sent_total",
        "Total reminder emails sent by tier",
        &["tier"]
    )
    .unwrap();

    /// Reminder ticks skipped by reason
    pub static ref REMINDERS_SKIPPED: IntCounterVec = register_int_counter_vec!(
        "rental_agreements_reminders_skipped_total",
        "Total reminder ticks that sent nothing, by reason",
        &["reason"]
    )
    .unwrap();

    /// Reminder sends that failed at the transport
    pub static ref REMINDER_SEND_FAILURES: IntCounter = register_int_counter!(
        "rental_agreements_reminder_send_failures_total",
        "Total reminder emails that failed to send"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SWEEP METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total sweep runs
    pub static ref SWEEP_RUNS: IntCounter = register_int_counter!(
        "rental_agreements_sweep_runs_total",
        "Total status sweep runs"
    )
    .unwrap();

    /// Total per-order errors during sweeps
    pub static ref SWEEP_ERRORS: IntCounter = register_int_counter!(
        "rental_agreements_sweep_errors_total",
        "Total per-order errors during status sweeps"
    )
    .unwrap();

    /// Sweep duration histogram (in milliseconds)
    pub static ref SWEEP_DURATION: Histogram = register_histogram!(
        "rental_agreements_sweep_duration_ms",
        "Status sweep duration in milliseconds",
        vec![100.0, 500.0, 1000.0, 5000.0, 10000.0, 30000.0, 60000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // GATE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total manual delivery-block overrides
    pub static ref GATE_OVERRIDES: IntCounter = register_int_counter!(
        "rental_agreements_gate_overrides_total",
        "Total manual delivery-block overrides"
    )
    .unwrap();
}
