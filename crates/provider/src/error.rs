use thiserror::Error;

/// Failure taxonomy for provider calls. `NotFound` is deliberately its own
/// variant - callers branch on it to recreate stale submissions, and it must
/// never be conflated with a transport hiccup.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("submission not found: {0}")]
    NotFound(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("rate limited: {0}")]
    RateLimited(String),
}

impl ProviderError {
    /// Whether a retry at a later tick can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport(_) | ProviderError::Timeout(_) | ProviderError::RateLimited(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}
