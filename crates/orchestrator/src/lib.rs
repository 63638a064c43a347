pub mod bootstrap;
pub mod orchestrator;
pub mod scheduler;
pub mod webhook;


// Re-export main types
pub use bootstrap::{build_orchestrator, init_observability, spawn_schedulers, BootstrapError};
pub use orchestrator::{
    AgreementOrchestrator, AgreementOrchestratorBuilder, BuilderError, OrchestratorConfig,
    OrchestratorError, ReminderReport, WebhookHandleError,
};
pub use scheduler::{spawn_interval, ExponentialBackoff};
pub use webhook::webhook_router;
