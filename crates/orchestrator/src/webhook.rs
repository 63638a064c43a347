use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rental_agreements_notify::Mailer;
use rental_agreements_provider::{EsignClient, SIGNATURE_HEADER};
use rental_agreements_sync::OrderStore;
use serde_json::json;
use std::sync::Arc;

use crate::orchestrator::{AgreementOrchestrator, WebhookHandleError};

/// Router for the provider callback endpoint, built for mounting into the
/// host web application.
pub fn webhook_router<C, S, M>(orchestrator: Arc<AgreementOrchestrator<C, S, M>>) -> Router
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route("/webhooks/esign", post(webhook_handler::<C, S, M>))
        .with_state(orchestrator)
}

async fn webhook_handler<C, S, M>(
    State(orchestrator): State<Arc<AgreementOrchestrator<C, S, M>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    C: EsignClient + 'static,
    S: OrderStore + 'static,
    M: Mailer + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match orchestrator.handle_webhook(signature, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for WebhookHandleError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookHandleError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            WebhookHandleError::Malformed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            WebhookHandleError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
