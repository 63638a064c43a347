use chrono::{DateTime, Utc};
use rental_agreements_types::{AgreementRecord, AgreementStatus, Submission};

/// Side effect a caller must carry out after an applied reconciliation.
/// Reconciliation itself never sends email or talks to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The agreement just transitioned to signed - send the confirmation.
    ConfirmationDue,

    /// The customer declined - a fresh submission is needed before the
    /// next reminder goes out.
    NewSubmissionNeeded,
}

/// Result of reconciling a local record against a remote snapshot
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub changed: bool,
    pub record: AgreementRecord,
    pub effects: Vec<Effect>,
}

impl Reconciliation {
    fn unchanged(record: &AgreementRecord) -> Self {
        Self {
            changed: false,
            record: record.clone(),
            effects: Vec::new(),
        }
    }
}

/// Compute the correct local agreement state from a remote submission
/// snapshot. Pure: applying the same snapshot to the result is a no-op,
/// which is what makes webhook redelivery and webhook/sweep races safe.
///
/// Priority order, first match wins:
/// 1. all recipients completed -> signed (terminal, unblocks delivery)
/// 2. any recipient declined   -> pending again, re-blocked, fresh submission
/// 3. any recipient opened     -> viewed
/// 4. otherwise                -> no change
///
/// A snapshot for a submission other than the one on record is ignored:
/// after a decline-and-recreate, late events from the replaced submission
/// must not touch the new cycle.
pub fn reconcile(
    record: &AgreementRecord,
    submission: &Submission,
    now: DateTime<Utc>,
) -> Reconciliation {
    match &record.submission_id {
        Some(id) if *id != submission.id => return Reconciliation::unchanged(record),
        _ => {}
    }

    let mut updated = record.clone();
    let mut effects = Vec::new();

    if submission.all_completed() {
        if record.status != AgreementStatus::Signed {
            updated.status = AgreementStatus::Signed;
            updated.record_signed_at(submission.earliest_completion().unwrap_or(now));
            updated.delivery_blocked = false;
            updated.block_override = None;
            updated.needs_new_submission = false;
            effects.push(Effect::ConfirmationDue);
        }
    } else if submission.any_declined() {
        // Signed is terminal; a late decline event cannot regress it.
        let already_declined =
            record.status == AgreementStatus::Pending && record.needs_new_submission;
        if record.status != AgreementStatus::Signed && !already_declined {
            updated.status = AgreementStatus::Pending;
            // A decline always re-blocks, even over an active override.
            updated.delivery_blocked = true;
            updated.block_override = None;
            updated.needs_new_submission = true;
            effects.push(Effect::NewSubmissionNeeded);
        }
    } else if submission.any_opened()
        && matches!(
            record.status,
            AgreementStatus::NotSent | AgreementStatus::Pending
        )
    {
        updated.status = AgreementStatus::Viewed;
        updated.record_viewed_at(submission.earliest_open().unwrap_or(now));
    }

    let changed = updated != *record;
    Reconciliation {
        changed,
        record: updated,
        effects,
    }
}
