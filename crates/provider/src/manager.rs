use rental_agreements_types::{Order, Submission};
use tracing::{info, warn};

use crate::client::{CreateSubmissionRequest, EsignClient, NewSubmitter};
use crate::error::ProviderError;
use crate::fields::agreement_fields;

/// Outcome of `create_or_reuse`: whether the submission came back from a
/// fetch of the existing reference or a brand-new creation. Callers reset
/// the reminder cycle only on `created`.
#[derive(Debug, Clone)]
pub struct CreateOrReuse {
    pub submission: Submission,
    pub created: bool,
}

/// Idempotent manager for provider-side signing submissions
pub struct SubmissionManager<C> {
    client: C,
    template_id: String,
}

impl<C: EsignClient> SubmissionManager<C> {
    pub fn new(client: C, template_id: impl Into<String>) -> Self {
        Self {
            client,
            template_id: template_id.into(),
        }
    }

    /// Reuse the existing submission when the provider still has it, create
    /// a fresh one otherwise.
    ///
    /// A stale reference (404 on fetch) is logged and falls through to
    /// creation - the caller never sees `NotFound` from here. Any other
    /// fetch failure propagates without creating, because duplicating a
    /// submission is worse than leaving the ambiguity to the next tick.
    pub async fn create_or_reuse(
        &self,
        order: &Order,
        existing_id: Option<&str>,
    ) -> Result<CreateOrReuse, ProviderError> {
        if let Some(id) = existing_id.filter(|id| !id.is_empty()) {
            match self.client.fetch_submission(id).await {
                Ok(submission) => {
                    return Ok(CreateOrReuse {
                        submission,
                        created: false,
                    });
                }
                Err(ProviderError::NotFound(_)) => {
                    warn!(
                        order_id = %order.id,
                        submission_id = %id,
                        "stored submission no longer exists at provider, creating a new one"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let request = CreateSubmissionRequest {
            template_id: self.template_id.clone(),
            send_email: false,
            submitters: vec![NewSubmitter {
                email: order.customer_email.clone(),
                name: order.customer_name.clone(),
                fields: agreement_fields(order),
            }],
        };

        let submission = self.client.create_submission(&request).await?;
        info!(
            order_id = %order.id,
            submission_id = %submission.id,
            "created signing submission"
        );

        Ok(CreateOrReuse {
            submission,
            created: true,
        })
    }

    /// Current provider-side state. `NotFound` propagates typed so callers
    /// can branch to the recreate path.
    pub async fn fetch_status(&self, submission_id: &str) -> Result<Submission, ProviderError> {
        self.client.fetch_submission(submission_id).await
    }

    /// Best-effort cancellation of a submission, used when an order is
    /// cancelled before signing. Failure is reported but callers are free
    /// to ignore it.
    pub async fn void(&self, submission_id: &str) -> Result<(), ProviderError> {
        match self.client.void_submission(submission_id).await {
            Ok(()) => {
                info!(submission_id = %submission_id, "voided signing submission");
                Ok(())
            }
            Err(e) => {
                warn!(
                    submission_id = %submission_id,
                    error = %e,
                    "failed to void signing submission"
                );
                Err(e)
            }
        }
    }

    /// Signing link for the named recipient. Provider payload shapes vary,
    /// so the recipient is looked up rather than assumed at index zero.
    pub fn signing_url_for(
        &self,
        submission: &Submission,
        email: &str,
    ) -> Result<String, ProviderError> {
        let submitter = submission.submitter_for(email).ok_or_else(|| {
            ProviderError::Validation(format!(
                "recipient {} is not on submission {}",
                email, submission.id
            ))
        })?;

        submitter.signing_url.clone().ok_or_else(|| {
            ProviderError::Validation(format!(
                "submission {} carries no signing url for {}",
                submission.id, email
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rental_agreements_types::{Submitter, SubmitterStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockEsignClient {
        existing: Arc<Mutex<Option<Submission>>>,
        fetch_error: Arc<Mutex<Option<fn(&str) -> ProviderError>>>,
        create_calls: Arc<AtomicUsize>,
        void_calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockEsignClient {
        fn with_existing(submission: Submission) -> Self {
            let mock = Self::default();
            *mock.existing.lock().unwrap() = Some(submission);
            mock
        }

        fn failing_fetch(error: fn(&str) -> ProviderError) -> Self {
            let mock = Self::default();
            *mock.fetch_error.lock().unwrap() = Some(error);
            mock
        }
    }

    #[async_trait]
    impl EsignClient for MockEsignClient {
        async fn create_submission(
            &self,
            request: &CreateSubmissionRequest,
        ) -> Result<Submission, ProviderError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Submission {
                id: "sub-new".to_string(),
                submitters: vec![Submitter {
                    email: request.submitters[0].email.clone(),
                    name: Some(request.submitters[0].name.clone()),
                    status: SubmitterStatus::Sent,
                    signing_url: Some("https://sign.example.com/s/new".to_string()),
                    opened_at: None,
                    completed_at: None,
                    declined_at: None,
                }],
                created_at: None,
            })
        }

        async fn fetch_submission(&self, submission_id: &str) -> Result<Submission, ProviderError> {
            if let Some(make_error) = *self.fetch_error.lock().unwrap() {
                return Err(make_error(submission_id));
            }
            self.existing
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProviderError::NotFound(submission_id.to_string()))
        }

        async fn void_submission(&self, submission_id: &str) -> Result<(), ProviderError> {
            self.void_calls
                .lock()
                .unwrap()
                .push(submission_id.to_string());
            Ok(())
        }
    }

    fn existing_submission() -> Submission {
        Submission {
            id: "sub-existing".to_string(),
            submitters: vec![Submitter {
                email: "jo@example.com".to_string(),
                name: Some("Jo Doe".to_string()),
                status: SubmitterStatus::Sent,
                signing_url: Some("https://sign.example.com/s/existing".to_string()),
                opened_at: None,
                completed_at: None,
                declined_at: None,
            }],
            created_at: None,
        }
    }

    fn test_order() -> Order {
        Order::new("order-1", "jo@example.com", "Jo Doe")
    }

    #[tokio::test]
    async fn test_reuses_existing_submission() {
        let client = MockEsignClient::with_existing(existing_submission());
        let create_calls = client.create_calls.clone();
        let manager = SubmissionManager::new(client, "tpl-1");

        let outcome = manager
            .create_or_reuse(&test_order(), Some("sub-existing"))
            .await
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.submission.id, "sub-existing");
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_id_falls_through_to_creation() {
        let client = MockEsignClient::failing_fetch(|id| ProviderError::NotFound(id.to_string()));
        let create_calls = client.create_calls.clone();
        let manager = SubmissionManager::new(client, "tpl-1");

        let outcome = manager
            .create_or_reuse(&test_order(), Some("sub-gone"))
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.submission.id, "sub-new");
        assert_eq!(create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_error_propagates_without_creating() {
        let client =
            MockEsignClient::failing_fetch(|_| ProviderError::Transport("boom".to_string()));
        let create_calls = client.create_calls.clone();
        let manager = SubmissionManager::new(client, "tpl-1");

        let result = manager
            .create_or_reuse(&test_order(), Some("sub-existing"))
            .await;

        assert!(matches!(result, Err(ProviderError::Transport(_))));
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_existing_id_creates() {
        let client = MockEsignClient::default();
        let manager = SubmissionManager::new(client, "tpl-1");

        let outcome = manager.create_or_reuse(&test_order(), None).await.unwrap();
        assert!(outcome.created);

        // Empty string counts as absent, not as a stale reference
        let outcome = manager
            .create_or_reuse(&test_order(), Some(""))
            .await
            .unwrap();
        assert!(outcome.created);
    }

    #[tokio::test]
    async fn test_signing_url_requires_named_recipient() {
        let client = MockEsignClient::default();
        let manager = SubmissionManager::new(client, "tpl-1");
        let submission = existing_submission();

        let url = manager
            .signing_url_for(&submission, "jo@example.com")
            .unwrap();
        assert_eq!(url, "https://sign.example.com/s/existing");

        let missing = manager.signing_url_for(&submission, "stranger@example.com");
        assert!(matches!(missing, Err(ProviderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_void_records_call() {
        let client = MockEsignClient::default();
        let void_calls = client.void_calls.clone();
        let manager = SubmissionManager::new(client, "tpl-1");

        manager.void("sub-1").await.unwrap();
        assert_eq!(void_calls.lock().unwrap().as_slice(), ["sub-1"]);
    }
}
