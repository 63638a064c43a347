use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rental_agreements_types::{Submission, Submitter, SubmitterStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::fields::TemplateField;

/// Operations the rest of the system needs from the signing provider.
/// `HttpEsignClient` is the production implementation; tests substitute
/// in-memory mocks.
#[async_trait]
pub trait EsignClient: Send + Sync {
    async fn create_submission(
        &self,
        request: &CreateSubmissionRequest,
    ) -> Result<Submission, ProviderError>;

    async fn fetch_submission(&self, submission_id: &str) -> Result<Submission, ProviderError>;

    async fn void_submission(&self, submission_id: &str) -> Result<(), ProviderError>;
}

/// Request body for opening a new signing submission
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubmissionRequest {
    pub template_id: String,

    /// The provider can send its own notification email; we always send our
    /// own copy instead, so this stays false.
    pub send_email: bool,

    pub submitters: Vec<NewSubmitter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubmitter {
    pub email: String,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP CLIENT
// ═══════════════════════════════════════════════════════════════════════════

/// REST adapter for the e-signature provider
pub struct HttpEsignClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpEsignClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    fn map_request_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }

    async fn error_from_response(
        context: &str,
        response: reqwest::Response,
    ) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("e-sign provider error on {}: {} - {}", context, status, body);

        match status.as_u16() {
            404 => ProviderError::NotFound(context.to_string()),
            401 | 403 => ProviderError::Auth(format!("HTTP {status}: {body}")),
            429 => ProviderError::RateLimited(format!("HTTP {status}: {body}")),
            _ => ProviderError::Transport(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl EsignClient for HttpEsignClient {
    async fn create_submission(
        &self,
        request: &CreateSubmissionRequest,
    ) -> Result<Submission, ProviderError> {
        let url = format!("{}/submissions", self.base_url);
        debug!("creating submission at {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            // A 404 here is a misconfigured endpoint, not a missing
            // resource - it must not trigger the stale-ID recreate path.
            return Err(match Self::error_from_response("create submission", response).await {
                ProviderError::NotFound(_) => {
                    ProviderError::Transport("HTTP 404 from submission create".to_string())
                }
                e => e,
            });
        }

        let payload: SubmissionPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Validation(format!("failed to parse response: {e}")))?;

        normalize_submission(payload, None)
    }

    async fn fetch_submission(&self, submission_id: &str) -> Result<Submission, ProviderError> {
        let url = format!("{}/submissions/{}", self.base_url, submission_id);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::NotFound(submission_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response("fetch submission", response).await);
        }

        let payload: SubmissionPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Validation(format!("failed to parse response: {e}")))?;

        normalize_submission(payload, Some(submission_id))
    }

    async fn void_submission(&self, submission_id: &str) -> Result<(), ProviderError> {
        let url = format!("{}/submissions/{}", self.base_url, submission_id);

        let response = self
            .client
            .delete(&url)
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::NotFound(submission_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response("void submission", response).await);
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RESPONSE NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════
//
// The provider answers in two shapes: a bare array of submitter records
// (creation) or an object wrapping a `submitters` list (fetch, webhooks).
// Both collapse into the one canonical `Submission` here; shape ambiguity
// never leaks past this module.

/// Provider identifiers arrive as either numbers or strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProviderId {
    Num(u64),
    Str(String),
}

impl ProviderId {
    fn into_string(self) -> String {
        match self {
            ProviderId::Num(n) => n.to_string(),
            ProviderId::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSubmitter {
    pub(crate) submission_id: Option<ProviderId>,
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default, alias = "embed_src")]
    pub(crate) signing_url: Option<String>,
    #[serde(default)]
    pub(crate) opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) declined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSubmission {
    pub(crate) id: ProviderId,
    pub(crate) submitters: Vec<RawSubmitter>,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SubmissionPayload {
    Object(RawSubmission),
    Submitters(Vec<RawSubmitter>),
}

fn normalize_status(raw: Option<&str>) -> Result<SubmitterStatus, ProviderError> {
    match raw {
        None | Some("sent") | Some("pending") | Some("awaiting") => Ok(SubmitterStatus::Sent),
        Some("opened") | Some("viewed") => Ok(SubmitterStatus::Opened),
        Some("completed") | Some("signed") => Ok(SubmitterStatus::Completed),
        Some("declined") => Ok(SubmitterStatus::Declined),
        Some(other) => Err(ProviderError::Validation(format!(
            "unknown submitter status: {other}"
        ))),
    }
}

fn normalize_submitter(raw: RawSubmitter) -> Result<Submitter, ProviderError> {
    let status = normalize_status(raw.status.as_deref())?;

    Ok(Submitter {
        email: raw.email,
        name: raw.name,
        status,
        signing_url: raw.signing_url,
        opened_at: raw.opened_at,
        completed_at: raw.completed_at,
        declined_at: raw.declined_at,
    })
}

/// Collapse either response shape into the canonical `Submission`.
///
/// `fallback_id` covers the array shape when no submitter carries a
/// `submission_id` (seen on some fetch responses).
pub(crate) fn normalize_submission(
    payload: SubmissionPayload,
    fallback_id: Option<&str>,
) -> Result<Submission, ProviderError> {
    match payload {
        SubmissionPayload::Object(raw) => {
            let id = raw.id.into_string();
            let submitters = raw
                .submitters
                .into_iter()
                .map(normalize_submitter)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Submission {
                id,
                submitters,
                created_at: raw.created_at,
            })
        }
        SubmissionPayload::Submitters(raw_submitters) => {
            let id = raw_submitters
                .iter()
                .find_map(|s| s.submission_id.clone())
                .map(ProviderId::into_string)
                .or_else(|| fallback_id.map(str::to_string))
                .ok_or_else(|| {
                    ProviderError::Validation(
                        "submitter list carries no submission id".to_string(),
                    )
                })?;

            let submitters = raw_submitters
                .into_iter()
                .map(normalize_submitter)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Submission {
                id,
                submitters,
                created_at: None,
            })
        }
    }
}
