use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the service: env-filterable, JSON-formatted
pub fn init_tracing(default_level: &str) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{default_level},rental_agreements=debug"))
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Correlation ID for tracking one agreement flow across webhook, sweep,
/// and reminder paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    /// Generate a new correlation ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the correlation ID as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for agreement flow tracking
#[derive(Debug, Clone)]
pub struct AgreementSpan {
    pub correlation_id: CorrelationId,
    pub order_id: String,
    pub submission_id: Option<String>,
}

impl AgreementSpan {
    pub fn new(order_id: String, submission_id: Option<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            order_id,
            submission_id,
        }
    }

    /// Enter a tracing span for this agreement flow
    pub fn enter(&self) -> tracing::span::EnteredSpan {
        tracing::info_span!(
            "agreement",
            correlation_id = %self.correlation_id,
            order_id = %self.order_id,
            submission_id = self.submission_id.as_deref().unwrap_or(""),
        )
        .entered()
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        // IDs should be unique
        assert_ne!(id1, id2);

        // Should be valid UUID format
        assert!(id1.as_str().len() == 36);
    }

    #[test]
    fn test_agreement_span_creation() {
        let span = AgreementSpan::new("order-123".to_string(), Some("sub-456".to_string()));

        assert_eq!(span.order_id, "order-123");
        assert_eq!(span.submission_id.as_deref(), Some("sub-456"));
    }
}
