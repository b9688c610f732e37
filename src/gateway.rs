use crate::error::{ExchangeError, StoreError};
use crate::exchange::{DescribeOutcome, ExchangeService, FetchOutcome, NegotiateOutcome};
use crate::model::QueryInput;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use url::Url;
use uuid::Uuid;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExchangeService>,
}

/// The connector's caller-facing surface: one endpoint per protocol
/// exchange, mirroring the engine's three operations.
pub fn router(service: Arc<ExchangeService>, max_body_bytes: usize, timeout_secs: u64) -> Router {
    Router::new()
        .route("/api/ids/request/description", post(handle_description))
        .route("/api/ids/request/contract", post(handle_contract))
        .route("/api/ids/request/artifact", post(handle_artifact))
        .with_state(AppState { service })
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(timeout_secs)))
}

pub async fn serve(
    service: Arc<ExchangeService>,
    bind: &str,
    max_body_bytes: usize,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "exchange gateway listening");
    axum::serve(listener, router(service, max_body_bytes, timeout_secs)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct DescriptionQuery {
    pub recipient: Url,
    #[serde(rename = "elementId")]
    pub element_id: Option<Url>,
}

/// POST /api/ids/request/description — send a description request.
pub(crate) async fn handle_description(
    State(state): State<AppState>,
    Query(query): Query<DescriptionQuery>,
) -> (StatusCode, String) {
    match state
        .service
        .describe(&query.recipient, query.element_id.as_ref())
        .await
    {
        Ok(DescribeOutcome::SelfDescription { payload }) => (StatusCode::OK, payload),
        Ok(DescribeOutcome::Saved {
            validation_key,
            payload,
        }) => (
            StatusCode::OK,
            format!("Validation: {validation_key}\nResponse: {payload}"),
        ),
        Ok(DescribeOutcome::Rejected(rejection)) => (StatusCode::OK, rejection.message()),
        Err(err) => error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub recipient: Url,
    #[serde(rename = "artifactId")]
    pub artifact_id: Url,
}

/// POST /api/ids/request/contract — run the negotiation. The request body is
/// the contract offer document.
pub(crate) async fn handle_contract(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
    offer: String,
) -> (StatusCode, String) {
    match state
        .service
        .negotiate(&query.recipient, &query.artifact_id, &offer)
        .await
    {
        Ok(NegotiateOutcome::Confirmed { agreement_id }) => {
            (StatusCode::OK, agreement_id.to_string())
        }
        Ok(NegotiateOutcome::Rejected(rejection)) => (StatusCode::OK, rejection.message()),
        Err(err) => error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    pub recipient: Url,
    #[serde(rename = "artifactId")]
    pub artifact_id: Url,
    #[serde(rename = "transferContract")]
    pub transfer_contract: Option<Url>,
    #[serde(rename = "resourceId")]
    pub resource_id: Uuid,
}

/// POST /api/ids/request/artifact — fetch artifact data. The optional request
/// body carries query parameters and headers for the provider's backend.
pub(crate) async fn handle_artifact(
    State(state): State<AppState>,
    Query(query): Query<ArtifactQuery>,
    body: String,
) -> (StatusCode, String) {
    let query_input: Option<QueryInput> = if body.trim().is_empty() {
        None
    } else {
        match serde_json::from_str(&body) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Could not parse query input from request body: {e}"),
                );
            }
        }
    };

    match state
        .service
        .fetch(
            &query.recipient,
            &query.artifact_id,
            query.transfer_contract.as_ref(),
            query.resource_id,
            query_input.as_ref(),
        )
        .await
    {
        Ok(FetchOutcome::Stored {
            resource_id,
            payload,
        }) => (
            StatusCode::OK,
            format!("Saved at: {resource_id}\nResponse: {payload}"),
        ),
        Ok(FetchOutcome::Rejected(rejection)) => (StatusCode::OK, rejection.message()),
        Err(err) => error_response(&err),
    }
}

/// Engine errors mapped to transport statuses: local validation is the
/// caller's fault, an unknown resource key is forbidden, everything else is
/// a server-side failure. Messages carry the cause, never stack detail.
fn error_response(err: &ExchangeError) -> (StatusCode, String) {
    let status = match err {
        ExchangeError::Validation(_) => StatusCode::BAD_REQUEST,
        ExchangeError::Store(StoreError::NotFound(_)) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = match err {
        ExchangeError::Store(StoreError::NotFound(_)) => {
            "Your key is not valid. Please request metadata first.".to_string()
        }
        other => other.to_string(),
    };
    (status, body)
}
