use rental_agreements_config::{validate_config, AppConfig, ConfigError};
use rental_agreements_metrics::{init_tracing, MetricsCollector, MetricsServer, TracingError};
use rental_agreements_notify::{
    EscalationNotifier, HttpApiMailer, MailerError, MessageContext, ReminderSchedule, Templates,
};
use rental_agreements_provider::{HttpEsignClient, ProviderError, SubmissionManager};
use rental_agreements_sync::{SqliteOrderStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::orchestrator::{
    AgreementOrchestrator, BuilderError, OrchestratorConfig,
};
use crate::scheduler::spawn_interval;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("mailer error: {0}")]
    Mailer(#[from] MailerError),

    #[error("builder error: {0}")]
    Builder(#[from] BuilderError),

    #[error("tracing error: {0}")]
    Tracing(#[from] TracingError),
}

/// Initialize logging and, when enabled, the metrics endpoint. Returns the
/// metrics server task handle, if one was spawned.
pub fn init_observability(
    config: &AppConfig,
    collector: Arc<MetricsCollector>,
) -> Result<Option<JoinHandle<()>>, BootstrapError> {
    init_tracing(&config.network.log_level)?;

    if !config.network.metrics_enabled {
        return Ok(None);
    }

    let addr = format!("0.0.0.0:{}", config.network.metrics_port);
    let server = MetricsServer::new(collector, addr);
    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    Ok(Some(handle))
}

/// Production composition root: validate the configuration and wire the
/// orchestrator over the SQLite store and the real HTTP collaborators.
pub async fn build_orchestrator(
    config: &AppConfig,
    collector: Arc<MetricsCollector>,
) -> Result<Arc<AgreementOrchestrator<HttpEsignClient, SqliteOrderStore, HttpApiMailer>>, BootstrapError>
{
    validate_config(config)?;

    let store = Arc::new(SqliteOrderStore::new(&config.store.db_path).await?);

    let client = HttpEsignClient::new(
        config.esign.base_url.clone(),
        config.esign.api_key.clone(),
        Duration::from_millis(config.esign.timeout_ms),
    )?;
    let manager = SubmissionManager::new(client, config.esign.template_id.clone());

    let mailer = HttpApiMailer::new(
        config.email.endpoint.clone(),
        config.email.api_key.clone(),
        Duration::from_millis(config.email.timeout_ms),
    )?;
    let templates = Templates::new(MessageContext {
        from_address: config.email.from_address.clone(),
        from_name: config.email.from_name.clone(),
        office_phone: config.email.office_phone.clone(),
    });
    let schedule = ReminderSchedule {
        normal_hours: config.reminders.normal_hours,
        urgent_hours: config.reminders.urgent_hours,
        critical_hours: config.reminders.critical_hours,
    };
    let notifier = EscalationNotifier::new(mailer, templates, schedule);

    let orchestrator = AgreementOrchestrator::builder()
        .with_store(store)
        .with_submission_manager(manager)
        .with_notifier(notifier)
        .with_webhook_secret(config.esign.webhook_secret.clone())
        .with_collector(collector)
        .with_config(OrchestratorConfig {
            reminder_batch_limit: config.reminders.batch_limit,
            sweep_batch_limit: config.sweep.batch_limit,
            recreate_after_decline: config.reminders.recreate_after_decline,
        })
        .build()?;

    Ok(Arc::new(orchestrator))
}

/// Spawn the two periodic drivers: the status sweep (pull reconciliation)
/// and the reminder tick. Handles run until aborted.
pub fn spawn_schedulers(
    orchestrator: Arc<AgreementOrchestrator<HttpEsignClient, SqliteOrderStore, HttpApiMailer>>,
    config: &AppConfig,
) -> Vec<JoinHandle<()>> {
    let sweep_orchestrator = orchestrator.clone();
    let sweep_handle = spawn_interval(
        "agreement-sweep",
        Duration::from_secs(config.sweep.interval_secs),
        move || {
            let orchestrator = sweep_orchestrator.clone();
            async move {
                orchestrator.run_sweep().await?;
                Ok(())
            }
        },
    );

    let reminder_orchestrator = orchestrator.clone();
    let reminder_handle = spawn_interval(
        "reminder-tick",
        Duration::from_secs(config.reminders.tick_interval_secs),
        move || {
            let orchestrator = reminder_orchestrator.clone();
            async move {
                orchestrator.run_reminder_tick().await?;
                Ok(())
            }
        },
    );

    vec![sweep_handle, reminder_handle]
}
