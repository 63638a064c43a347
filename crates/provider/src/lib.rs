pub mod client;
pub mod error;
pub mod fields;
pub mod manager;
pub mod webhook;

pub use client::{
    CreateSubmissionRequest, EsignClient, HttpEsignClient, NewSubmitter,
};
pub use error::ProviderError;
pub use fields::{agreement_fields, TemplateField};
pub use manager::{CreateOrReuse, SubmissionManager};
pub use webhook::{parse_event, verify_signature, WebhookError, WebhookEvent, SIGNATURE_HEADER};
