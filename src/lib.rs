//! Rental agreement lifecycle for a party-rental back office.
//!
//! Every order must be digitally signed by the customer through an external
//! e-signature provider before delivery is permitted. This workspace keeps
//! the local order store and the provider consistent under partial failure,
//! unreliable webhooks, and provider-side resource churn, drives an
//! escalating reminder campaign tied to time-until-delivery, and enforces
//! the "no signature, no delivery" gate.
//!
//! The member crates, leaves first:
//! - [`types`](rental_agreements_types): the order aggregate and agreement record
//! - [`provider`](rental_agreements_provider): submission manager over the e-sign API
//! - [`sync`](rental_agreements_sync): reconciliation engine and order stores
//! - [`notify`](rental_agreements_notify): escalating reminder campaign
//! - [`gate`](rental_agreements_gate): delivery gate and audited override
//! - [`config`](rental_agreements_config): layered configuration with hot reload
//! - [`metrics`](rental_agreements_metrics): Prometheus metrics and tracing setup
//! - [`orchestrator`](rental_agreements_orchestrator): composition root, webhook
//!   endpoint, and scheduled entry points

pub use rental_agreements_config as config;
pub use rental_agreements_gate as gate;
pub use rental_agreements_metrics as metrics;
pub use rental_agreements_notify as notify;
pub use rental_agreements_orchestrator as orchestrator;
pub use rental_agreements_provider as provider;
pub use rental_agreements_sync as sync;
pub use rental_agreements_types as types;
