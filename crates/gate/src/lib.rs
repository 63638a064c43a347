use chrono::Utc;
use rental_agreements_sync::{OrderStore, StoreError};
use rental_agreements_types::{AgreementTransition, BlockOverride, Order};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// The predicate downstream dispatch consults. The flag it reads is
/// maintained exclusively by the synchronizer and `override_block`.
pub fn can_deliver(order: &Order) -> bool {
    !order.agreement.delivery_blocked
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("override reason is mandatory")]
    MissingReason,

    #[error("override actor is mandatory")]
    MissingActor,

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("conditional update kept losing for order {0}, giving up")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Audited manual escape valve for the delivery block
pub struct DeliveryGate<S> {
    store: Arc<S>,
    max_conflict_retries: u32,
}

impl<S: OrderStore> DeliveryGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_conflict_retries: 3,
        }
    }

    /// Lift the block for one order without touching the agreement status.
    /// Reason and actor are mandatory and persisted; the override is
    /// cleared automatically once the agreement is actually signed.
    pub async fn override_block(
        &self,
        order_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Order, GateError> {
        if reason.trim().is_empty() {
            return Err(GateError::MissingReason);
        }
        if actor.trim().is_empty() {
            return Err(GateError::MissingActor);
        }

        for _ in 0..=self.max_conflict_retries {
            let mut order = self
                .store
                .get(order_id)
                .await?
                .ok_or_else(|| GateError::NotFound(order_id.to_string()))?;

            let now = Utc::now();
            let mut record = order.agreement.clone();
            record.delivery_blocked = false;
            record.block_override = Some(BlockOverride {
                reason: reason.trim().to_string(),
                by: actor.trim().to_string(),
                at: now,
            });

            match self
                .store
                .update_agreement(order_id, order.version, &record)
                .await
            {
                Ok(new_version) => {
                    warn!(
                        order_id = %order_id,
                        actor = %actor,
                        reason = %reason,
                        "delivery block manually overridden"
                    );

                    let transition =
                        AgreementTransition::new(order.agreement.status, record.status, now)
                            .with_details(format!("delivery block overridden by {actor}: {reason}"));
                    if let Err(e) = self.store.record_transition(order_id, transition).await {
                        warn!(order_id = %order_id, error = %e, "failed to record override audit");
                    }

                    order.agreement = record;
                    order.version = new_version;
                    return Ok(order);
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(GateError::Conflict(order_id.to_string()))
    }
}
