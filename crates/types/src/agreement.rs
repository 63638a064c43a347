use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local status of the rental agreement attached to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    /// No submission has been opened with the signing provider
    NotSent,

    /// Submission exists, awaiting the customer
    Pending,

    /// Customer opened the signing link but has not completed it
    Viewed,

    /// Fully signed - terminal
    Signed,

    /// Customer declined - soft-terminal, a fresh submission restarts the cycle
    Declined,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::NotSent => "not_sent",
            AgreementStatus::Pending => "pending",
            AgreementStatus::Viewed => "viewed",
            AgreementStatus::Signed => "signed",
            AgreementStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_sent" => Some(AgreementStatus::NotSent),
            "pending" => Some(AgreementStatus::Pending),
            "viewed" => Some(AgreementStatus::Viewed),
            "signed" => Some(AgreementStatus::Signed),
            "declined" => Some(AgreementStatus::Declined),
            _ => None,
        }
    }
}

/// Reminder escalation tier. Variant order is the escalation order; the
/// derived `Ord` is what "tier only advances forward" is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderTier {
    None,
    Initial,
    Normal,
    Urgent,
    Critical,
    SignedConfirmed,
}

impl ReminderTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderTier::None => "none",
            ReminderTier::Initial => "initial",
            ReminderTier::Normal => "normal",
            ReminderTier::Urgent => "urgent",
            ReminderTier::Critical => "critical",
            ReminderTier::SignedConfirmed => "signed_confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ReminderTier::None),
            "initial" => Some(ReminderTier::Initial),
            "normal" => Some(ReminderTier::Normal),
            "urgent" => Some(ReminderTier::Urgent),
            "critical" => Some(ReminderTier::Critical),
            "signed_confirmed" => Some(ReminderTier::SignedConfirmed),
            _ => None,
        }
    }
}

/// Audited manual release of the delivery gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOverride {
    /// Operator-supplied justification, mandatory
    pub reason: String,

    /// Operator identity, mandatory
    pub by: String,

    /// When the override was applied
    pub at: DateTime<Utc>,
}

/// The agreement sub-record persisted with each order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub status: AgreementStatus,

    /// Provider-side submission reference. Never trusted without a
    /// successful fetch - the provider may have expired or deleted it.
    pub submission_id: Option<String>,

    pub signed_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,

    /// Hard dispatch gate. True unless signed or overridden.
    pub delivery_blocked: bool,

    pub block_override: Option<BlockOverride>,

    pub last_reminder_tier: ReminderTier,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,

    /// Set when a decline or a stale submission ID means the next send
    /// must open a fresh submission.
    pub needs_new_submission: bool,
}

impl Default for AgreementRecord {
    fn default() -> Self {
        Self {
            status: AgreementStatus::NotSent,
            submission_id: None,
            signed_at: None,
            viewed_at: None,
            delivery_blocked: true,
            block_override: None,
            last_reminder_tier: ReminderTier::None,
            last_reminder_sent_at: None,
            needs_new_submission: false,
        }
    }
}

impl AgreementRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_signed(&self) -> bool {
        self.status == AgreementStatus::Signed
    }

    /// Record the signing timestamp. Set exactly once: a later or equal
    /// observation never overwrites the first one recorded.
    pub fn record_signed_at(&mut self, at: DateTime<Utc>) {
        match self.signed_at {
            Some(existing) if existing <= at => {}
            _ => self.signed_at = Some(at),
        }
    }

    /// Record the viewed timestamp, set exactly once.
    pub fn record_viewed_at(&mut self, at: DateTime<Utc>) {
        if self.viewed_at.is_none() {
            self.viewed_at = Some(at);
        }
    }

    /// Restart the cycle on a brand-new submission. This is the only path
    /// that moves the reminder tier backwards.
    pub fn attach_new_submission(&mut self, submission_id: impl Into<String>) {
        self.submission_id = Some(submission_id.into());
        self.status = AgreementStatus::Pending;
        self.last_reminder_tier = ReminderTier::None;
        self.last_reminder_sent_at = None;
        self.needs_new_submission = false;
    }
}

/// One entry of the persisted agreement audit history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementTransition {
    pub from_status: AgreementStatus,
    pub to_status: AgreementStatus,
    pub at: DateTime<Utc>,
    pub details: Option<String>,
}

impl AgreementTransition {
    pub fn new(from_status: AgreementStatus, to_status: AgreementStatus, at: DateTime<Utc>) -> Self {
        Self {
            from_status,
            to_status,
            at,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_tier_ordering() {
        assert!(ReminderTier::None < ReminderTier::Initial);
        assert!(ReminderTier::Initial < ReminderTier::Normal);
        assert!(ReminderTier::Normal < ReminderTier::Urgent);
        assert!(ReminderTier::Urgent < ReminderTier::Critical);
        assert!(ReminderTier::Critical < ReminderTier::SignedConfirmed);
    }

    #[test]
    fn test_signed_at_set_once() {
        let mut record = AgreementRecord::new();
        record.record_signed_at(ts(1000));
        assert_eq!(record.signed_at, Some(ts(1000)));

        // Later observation does not overwrite
        record.record_signed_at(ts(2000));
        assert_eq!(record.signed_at, Some(ts(1000)));

        // An earlier completion timestamp wins - earliest observed
        record.record_signed_at(ts(500));
        assert_eq!(record.signed_at, Some(ts(500)));
    }

    #[test]
    fn test_viewed_at_set_once() {
        let mut record = AgreementRecord::new();
        record.record_viewed_at(ts(1000));
        record.record_viewed_at(ts(500));
        assert_eq!(record.viewed_at, Some(ts(1000)));
    }

    #[test]
    fn test_attach_new_submission_resets_cycle() {
        let mut record = AgreementRecord::new();
        record.last_reminder_tier = ReminderTier::Critical;
        record.needs_new_submission = true;

        record.attach_new_submission("sub-2");

        assert_eq!(record.status, AgreementStatus::Pending);
        assert_eq!(record.submission_id.as_deref(), Some("sub-2"));
        assert_eq!(record.last_reminder_tier, ReminderTier::None);
        assert!(!record.needs_new_submission);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AgreementStatus::NotSent,
            AgreementStatus::Pending,
            AgreementStatus::Viewed,
            AgreementStatus::Signed,
            AgreementStatus::Declined,
        ] {
            assert_eq!(AgreementStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AgreementStatus::parse("bogus"), None);
    }
}
