use rental_agreements_types::{AgreementRecord, AgreementStatus, ReminderTier};

/// Hours-until-delivery thresholds for each escalation tier
#[derive(Debug, Clone)]
pub struct ReminderSchedule {
    pub normal_hours: i64,
    pub urgent_hours: i64,
    pub critical_hours: i64,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            normal_hours: 48,
            urgent_hours: 24,
            critical_hours: 8,
        }
    }
}

/// Pick the next reminder tier to dispatch, if any.
///
/// Pure function of the record and time remaining. Advances at most one
/// step per invocation and never repeats a tier already sent in this
/// submission cycle; a decline resets the cycle by resetting the tier.
pub fn select_tier(
    record: &AgreementRecord,
    hours_until_delivery: i64,
    schedule: &ReminderSchedule,
) -> Option<ReminderTier> {
    if record.status == AgreementStatus::Signed {
        return None;
    }

    let tier = record.last_reminder_tier;

    if tier < ReminderTier::Initial {
        return Some(ReminderTier::Initial);
    }
    if tier < ReminderTier::Normal && hours_until_delivery <= schedule.normal_hours {
        return Some(ReminderTier::Normal);
    }
    if tier < ReminderTier::Urgent && hours_until_delivery <= schedule.urgent_hours {
        return Some(ReminderTier::Urgent);
    }
    if tier < ReminderTier::Critical && hours_until_delivery <= schedule.critical_hours {
        return Some(ReminderTier::Critical);
    }

    None
}
