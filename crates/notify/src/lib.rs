pub mod escalation;
pub mod mailer;
pub mod schedule;
pub mod templates;

pub use escalation::{EscalationNotifier, NotifyError, SkipReason, TickDecision, TickOutcome};
pub use mailer::{EmailMessage, HttpApiMailer, Mailer, MailerError, RecordingMailer};
pub use schedule::{select_tier, ReminderSchedule};
pub use templates::{MessageContext, Templates};
