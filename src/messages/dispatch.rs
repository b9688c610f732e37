use super::types::{Envelope, MessageKind, RequestFields, RequestHeader, WireMessage};
use crate::error::MessageError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure reported by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("failed to transmit message: {0}")]
    Send(String),

    #[error("failed to receive response: {0}")]
    Receive(String),
}

/// Boundary to the wire. The dispatcher owns message construction and
/// envelope parsing; implementations only move bytes.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_and_receive(
        &self,
        recipient: &Url,
        message: &WireMessage,
    ) -> Result<String, TransportFailure>;
}

/// Default transport: a single JSON POST per exchange with bounded timeouts.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for HttpTransport {
    async fn send_and_receive(
        &self,
        recipient: &Url,
        message: &WireMessage,
    ) -> Result<String, TransportFailure> {
        let response = self
            .client
            .post(recipient.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportFailure::Receive(format!("request timed out: {e}"))
                } else {
                    TransportFailure::Send(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportFailure::Receive(format!(
                "peer answered with status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TransportFailure::Receive(e.to_string()))
    }
}

/// Builds the outbound protocol message for a given kind, transmits it and
/// deserializes the response into an [`Envelope`].
///
/// No retries at this layer; transient failure is surfaced to the caller,
/// which owns retry policy.
pub struct RequestDispatcher {
    transport: Arc<dyn MessageTransport>,
    issuer_connector: Url,
    model_version: String,
}

impl RequestDispatcher {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        issuer_connector: Url,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            issuer_connector,
            model_version: model_version.into(),
        }
    }

    pub async fn send(
        &self,
        recipient: &Url,
        kind: MessageKind,
        fields: RequestFields,
        payload: String,
    ) -> Result<Envelope, MessageError> {
        let message = self.build(recipient, kind, fields, payload)?;

        tracing::debug!(%recipient, kind = %kind, "sending protocol message");
        let body = self
            .transport
            .send_and_receive(recipient, &message)
            .await
            .map_err(|failure| match failure {
                TransportFailure::Send(reason) => MessageError::Build {
                    kind: kind.to_string(),
                    reason,
                },
                TransportFailure::Receive(reason) => MessageError::ResponseRead(reason),
            })?;

        Envelope::from_response_body(&body).map_err(MessageError::ResponseRead)
    }

    fn build(
        &self,
        recipient: &Url,
        kind: MessageKind,
        fields: RequestFields,
        payload: String,
    ) -> Result<WireMessage, MessageError> {
        if !matches!(recipient.scheme(), "http" | "https") || recipient.host().is_none() {
            return Err(MessageError::Build {
                kind: kind.to_string(),
                reason: format!("recipient {recipient} is not a reachable connector url"),
            });
        }

        let header = RequestHeader::new(
            kind,
            self.issuer_connector.clone(),
            recipient.clone(),
            self.model_version.clone(),
            fields,
        );
        Ok(WireMessage { header, payload })
    }
}
