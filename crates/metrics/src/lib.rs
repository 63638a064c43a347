//! Metrics and monitoring for the rental agreement service
//!
//! This crate provides metrics collection and monitoring for the agreement
//! lifecycle: submissions, webhooks, reconciliation, the reminder campaign,
//! and the delivery gate.
//!
//! # Features
//!
//! - Prometheus metrics exposition
//! - HTTP endpoint for metrics scraping
//! - Tracing integration with correlation IDs
//! - Span tracking for agreement flows
//!
//! # Example
//!
//! ```no_run
//! use rental_agreements_metrics::{MetricsCollector, MetricsServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create metrics collector
//!     let collector = Arc::new(MetricsCollector::new());
//!
//!     // Record some metrics
//!     collector.record_webhook_received();
//!
//!     // Start metrics HTTP server
//!     let server = MetricsServer::new(collector.clone(), "0.0.0.0:9090".to_string());
//!     server.serve().await.unwrap();
//! }
//! ```

pub mod collector;
pub mod http;
pub mod metrics;
pub mod tracing;

pub use self::collector::{MetricsCollector, MetricsError};
pub use self::http::{MetricsServer, MetricsServerError};
pub use self::tracing::{init_tracing, AgreementSpan, CorrelationId, TracingError};
