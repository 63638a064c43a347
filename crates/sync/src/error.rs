use rental_agreements_provider::ProviderError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("conditional update kept losing for order {0}, giving up")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}
