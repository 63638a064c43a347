use chrono::{DateTime, Utc};
use rental_agreements_types::{Order, ReminderTier};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mailer::{Mailer, MailerError};
use crate::schedule::{select_tier, ReminderSchedule};
use crate::templates::Templates;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email send failed: {0}")]
    Mailer(#[from] MailerError),
}

/// Why a tick sent nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Cancelled orders get no further mail, checked before anything else
    Cancelled,

    AlreadySigned,

    /// No structured delivery date; flagged for an operator, never derived
    /// from free text
    NoDeliveryDate,

    /// Current tier's threshold not reached yet
    NotDue,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Cancelled => "cancelled",
            SkipReason::AlreadySigned => "already_signed",
            SkipReason::NoDeliveryDate => "no_delivery_date",
            SkipReason::NotDue => "not_due",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A message went out; caller persists the tier advance
    Sent(ReminderTier),

    Skipped(SkipReason),
}

/// What a tick would do, decided before any I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Send(ReminderTier),
    Skip(SkipReason),
}

/// Drives the escalating reminder campaign for one order at a time.
///
/// This component owns copy and dispatch only. Persisting the advanced tier
/// is the caller's job, which is what keeps a failed send from skipping a
/// tier: nothing was persisted, so the next tick retries the same tier.
pub struct EscalationNotifier<M> {
    mailer: M,
    templates: Templates,
    schedule: ReminderSchedule,
}

impl<M: Mailer> EscalationNotifier<M> {
    pub fn new(mailer: M, templates: Templates, schedule: ReminderSchedule) -> Self {
        Self {
            mailer,
            templates,
            schedule,
        }
    }

    /// Decide what a tick would do for this order, without any I/O. Lets
    /// callers skip the provider round-trip when nothing is due.
    pub fn decide(&self, order: &Order, now: DateTime<Utc>) -> TickDecision {
        if order.cancelled {
            return TickDecision::Skip(SkipReason::Cancelled);
        }

        if order.agreement.is_signed() {
            return TickDecision::Skip(SkipReason::AlreadySigned);
        }

        let Some(hours) = order.hours_until_delivery(now) else {
            // The initial email still goes out - the customer should get
            // their signing link even while scheduling is unresolved.
            if order.agreement.last_reminder_tier < ReminderTier::Initial {
                return TickDecision::Send(ReminderTier::Initial);
            }
            return TickDecision::Skip(SkipReason::NoDeliveryDate);
        };

        match select_tier(&order.agreement, hours, &self.schedule) {
            Some(tier) => TickDecision::Send(tier),
            None => TickDecision::Skip(SkipReason::NotDue),
        }
    }

    /// One reminder tick for one order. Returns the tier that went out so
    /// the caller can record it, or the reason nothing was sent.
    ///
    /// The initial tier needs a signing link; callers pass it when they
    /// have a live submission.
    pub async fn run_tick(
        &self,
        order: &Order,
        signing_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, NotifyError> {
        match self.decide(order, now) {
            TickDecision::Send(tier) => self.dispatch(order, tier, signing_url).await,
            TickDecision::Skip(reason) => {
                match reason {
                    SkipReason::Cancelled => {
                        debug!(order_id = %order.id, "order cancelled, no reminder");
                    }
                    SkipReason::NoDeliveryDate => {
                        warn!(
                            order_id = %order.id,
                            "order has no structured delivery date, flagging instead of guessing"
                        );
                    }
                    _ => {}
                }
                Ok(TickOutcome::Skipped(reason))
            }
        }
    }

    /// Send the signed confirmation, exactly once per signature. Returns
    /// the tier to persist, or `None` when it already went out.
    pub async fn send_signed_confirmation(
        &self,
        order: &Order,
    ) -> Result<Option<ReminderTier>, NotifyError> {
        if order.agreement.last_reminder_tier == ReminderTier::SignedConfirmed {
            return Ok(None);
        }

        let message = self
            .templates
            .render(ReminderTier::SignedConfirmed, order, None);
        self.mailer.send(&message).await?;

        info!(order_id = %order.id, "sent signed confirmation");
        Ok(Some(ReminderTier::SignedConfirmed))
    }

    async fn dispatch(
        &self,
        order: &Order,
        tier: ReminderTier,
        signing_url: Option<&str>,
    ) -> Result<TickOutcome, NotifyError> {
        let message = self.templates.render(tier, order, signing_url);

        match self.mailer.send(&message).await {
            Ok(()) => {
                info!(
                    order_id = %order.id,
                    tier = tier.as_str(),
                    "sent agreement reminder"
                );
                Ok(TickOutcome::Sent(tier))
            }
            Err(e) => {
                // Tier not advanced: the next tick retries this same tier.
                warn!(
                    order_id = %order.id,
                    tier = tier.as_str(),
                    error = %e,
                    "reminder send failed"
                );
                Err(e.into())
            }
        }
    }
}
