use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-recipient status reported by the signing provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitterStatus {
    /// Signing request delivered, not yet opened
    Sent,

    /// Recipient opened the signing link
    Opened,

    /// Recipient completed their signature
    Completed,

    /// Recipient declined to sign
    Declined,
}

/// One recipient of a signing submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub email: String,
    pub name: Option<String>,
    pub status: SubmitterStatus,
    pub signing_url: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
}

/// Canonical, normalized view of a provider-side signing submission.
///
/// The shape stays a list of submitters even though this domain always has
/// exactly one (the customer) - a second signer is a plausible future need
/// and the provider already models it this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub submitters: Vec<Submitter>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Every recipient has completed. False for an empty submitter list -
    /// a submission with nobody on it proves nothing.
    pub fn all_completed(&self) -> bool {
        !self.submitters.is_empty()
            && self
                .submitters
                .iter()
                .all(|s| s.status == SubmitterStatus::Completed)
    }

    pub fn any_declined(&self) -> bool {
        self.submitters
            .iter()
            .any(|s| s.status == SubmitterStatus::Declined)
    }

    /// Any recipient has at least opened the link (or gone further).
    pub fn any_opened(&self) -> bool {
        self.submitters.iter().any(|s| {
            matches!(
                s.status,
                SubmitterStatus::Opened | SubmitterStatus::Completed
            )
        })
    }

    /// Earliest completion timestamp across recipients.
    pub fn earliest_completion(&self) -> Option<DateTime<Utc>> {
        self.submitters.iter().filter_map(|s| s.completed_at).min()
    }

    /// Earliest open timestamp across recipients.
    pub fn earliest_open(&self) -> Option<DateTime<Utc>> {
        self.submitters.iter().filter_map(|s| s.opened_at).min()
    }

    /// Case-insensitive recipient lookup.
    pub fn submitter_for(&self, email: &str) -> Option<&Submitter> {
        self.submitters
            .iter()
            .find(|s| s.email.eq_ignore_ascii_case(email))
    }
}
