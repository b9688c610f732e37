use crate::description::MetadataTranslator;
use crate::error::{ExchangeError, Result, StoreError};
use crate::messages::{
    classify, Classification, Envelope, MessageKind, Phase, RequestDispatcher, RequestFields,
    ResponseHeader,
};
use crate::model::QueryInput;
use crate::negotiation::{Interpretation, NegotiationEngine};
use crate::store::ResourceStore;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// A peer-issued non-success response. This is a normal protocol outcome,
/// not an error: nothing to retry, nothing to alarm on.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// The peer rejected the contract terms.
    Contract { payload: String },
    /// The peer rejected the request itself.
    Generic { payload: String },
    /// The peer answered with a header this phase does not know. Reported
    /// verbatim for diagnostic visibility.
    Unexpected {
        header: ResponseHeader,
        payload: String,
    },
}

impl Rejection {
    /// Text handed back to the caller, rejection payload embedded verbatim.
    pub fn message(&self) -> String {
        match self {
            Self::Contract { payload } => {
                format!("Received contract rejection message: {payload}")
            }
            Self::Generic { payload } => format!("Received rejection message: {payload}"),
            Self::Unexpected { header, payload } => format!(
                "Received unexpected response: header {}, payload {payload}",
                serde_json::to_string(header).unwrap_or_else(|_| header.message_type.clone())
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DescribeOutcome {
    /// Discovery mode: the raw self-description payload, untouched and
    /// unpersisted.
    SelfDescription { payload: String },
    /// The element's description was translated and persisted; the local
    /// resource id is the caller's validation key for later fetches.
    Saved {
        validation_key: Uuid,
        payload: String,
    },
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub enum NegotiateOutcome {
    /// Agreement reached and confirmation delivered.
    Confirmed { agreement_id: Url },
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Stored {
        resource_id: Uuid,
        payload: String,
    },
    Rejected(Rejection),
}

/// Top-level coordinator for the three protocol exchanges.
///
/// All collaborators are injected at construction; the service holds no
/// mutable state and is safe to invoke reentrantly.
pub struct ExchangeService {
    dispatcher: Arc<RequestDispatcher>,
    negotiation: NegotiationEngine,
    translator: MetadataTranslator,
    store: Arc<dyn ResourceStore>,
}

impl ExchangeService {
    pub fn new(dispatcher: Arc<RequestDispatcher>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            negotiation: NegotiationEngine::new(dispatcher.clone()),
            translator: MetadataTranslator::new(),
            dispatcher,
            store,
        }
    }

    /// Requests a peer's self-description, or a specific element's
    /// description which is then translated and persisted.
    pub async fn describe(
        &self,
        recipient: &Url,
        element_id: Option<&Url>,
    ) -> Result<DescribeOutcome> {
        let envelope = self
            .dispatcher
            .send(
                recipient,
                MessageKind::DescriptionRequest,
                RequestFields {
                    requested_element: element_id.cloned(),
                    ..RequestFields::default()
                },
                String::new(),
            )
            .await?;

        match classify(&envelope.header, Phase::Description) {
            Classification::DescriptionResponse => {}
            other => return Ok(DescribeOutcome::Rejected(report_rejection(other, envelope))),
        }

        let Some(element_id) = element_id else {
            // Discovery mode: hand the self-description back untouched.
            return Ok(DescribeOutcome::SelfDescription {
                payload: envelope.payload,
            });
        };

        let resource = self
            .translator
            .resolve_resource(&envelope.payload, element_id)?;
        let metadata = self.translator.translate(&resource)?;
        let validation_key = self.store.save_metadata(&metadata).await?;
        tracing::info!(%element_id, %validation_key, "description saved");

        Ok(DescribeOutcome::Saved {
            validation_key,
            payload: envelope.payload,
        })
    }

    /// Runs the contract phase end to end. Returns the agreement id only
    /// after the confirmation has been delivered to the recipient.
    pub async fn negotiate(
        &self,
        recipient: &Url,
        artifact_id: &Url,
        offer_document: &str,
    ) -> Result<NegotiateOutcome> {
        let request = NegotiationEngine::build_contract_request(offer_document, artifact_id)?;
        let envelope = self.negotiation.submit(recipient, &request).await?;

        match self.negotiation.interpret(&envelope)? {
            Interpretation::Agreed { agreement_id } => {
                let agreement_id = self
                    .negotiation
                    .confirm(recipient, &agreement_id, envelope.payload)
                    .await?;
                Ok(NegotiateOutcome::Confirmed { agreement_id })
            }
            Interpretation::Rejected { classification } => Ok(NegotiateOutcome::Rejected(
                report_rejection(classification, envelope),
            )),
        }
    }

    /// Requests artifact data under an agreed contract and persists it
    /// against an already-known local resource.
    pub async fn fetch(
        &self,
        recipient: &Url,
        artifact_id: &Url,
        contract_id: Option<&Url>,
        resource_id: Uuid,
        query: Option<&QueryInput>,
    ) -> Result<FetchOutcome> {
        // Both preconditions are checked before any message is sent.
        if !self.store.exists(resource_id).await? {
            tracing::warn!(%recipient, %artifact_id, %resource_id,
                "data request with unknown resource id");
            return Err(StoreError::NotFound(resource_id).into());
        }
        if let Some(query) = query {
            query.validate().map_err(ExchangeError::Validation)?;
        }

        let query_payload = match query {
            Some(query) => serde_json::to_string(query)
                .map_err(|e| ExchangeError::Other(anyhow::anyhow!("query input: {e}")))?,
            None => String::new(),
        };

        let envelope = self
            .dispatcher
            .send(
                recipient,
                MessageKind::ArtifactRequest,
                RequestFields {
                    requested_artifact: Some(artifact_id.clone()),
                    transfer_contract: contract_id.cloned(),
                    ..RequestFields::default()
                },
                query_payload,
            )
            .await?;

        match classify(&envelope.header, Phase::Artifact) {
            Classification::ArtifactResponse => {}
            other => return Ok(FetchOutcome::Rejected(report_rejection(other, envelope))),
        }

        self.store.save_data(resource_id, &envelope.payload).await?;
        tracing::info!(%resource_id, "artifact data saved");

        Ok(FetchOutcome::Stored {
            resource_id,
            payload: envelope.payload,
        })
    }
}

/// Uniform mapping of a non-success classification to a reportable outcome.
/// Peer rejections log at info; unexpected headers at warn.
fn report_rejection(classification: Classification, envelope: Envelope) -> Rejection {
    match classification {
        Classification::ContractRejection => {
            tracing::info!(reason = ?envelope.header.rejection_reason, "contract rejected by peer");
            Rejection::Contract {
                payload: envelope.payload,
            }
        }
        Classification::Rejection => {
            tracing::info!(reason = ?envelope.header.rejection_reason, "request rejected by peer");
            Rejection::Generic {
                payload: envelope.payload,
            }
        }
        _ => {
            tracing::warn!(header = %envelope.header.message_type, "unexpected response header");
            Rejection::Unexpected {
                header: envelope.header,
                payload: envelope.payload,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MessageError, NegotiationError, ValidationError};
    use crate::messages::{MessageTransport, TransportFailure, WireMessage};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that counts calls and replays a scripted body.
    struct ScriptedTransport {
        body: String,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn send_and_receive(
            &self,
            _recipient: &Url,
            _message: &WireMessage,
        ) -> std::result::Result<String, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn envelope_body(message_type: &str, payload: &str) -> String {
        serde_json::json!({
            "header": {"@type": message_type, "@id": "urn:message:1"},
            "payload": payload
        })
        .to_string()
    }

    fn service(
        transport: Arc<dyn MessageTransport>,
        store: Arc<MemoryStore>,
    ) -> ExchangeService {
        let dispatcher = Arc::new(RequestDispatcher::new(
            transport,
            "https://consumer.example/connector".parse().unwrap(),
            "4.0.0",
        ));
        ExchangeService::new(dispatcher, store)
    }

    fn recipient() -> Url {
        "https://provider.example/api/ids/data".parse().unwrap()
    }

    #[tokio::test]
    async fn fetch_with_unknown_resource_never_touches_the_wire() {
        let transport = Arc::new(ScriptedTransport::new("unused"));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport.clone(), store);

        let err = svc
            .fetch(
                &recipient(),
                &"https://provider.example/artifacts/1".parse().unwrap(),
                None,
                Uuid::new_v4(),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::Store(StoreError::NotFound(_))
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn fetch_with_blank_query_input_fails_before_any_send() {
        let transport = Arc::new(ScriptedTransport::new("unused"));
        let store = Arc::new(MemoryStore::new());
        let resource_id = Uuid::new_v4();
        store.seed(resource_id, crate::model::ResourceMetadata {
            title: None,
            description: None,
            keywords: vec![],
            representations: Default::default(),
            policy: None,
            owner: None,
            license: None,
            version: None,
        });
        let svc = service(transport.clone(), store);

        let query = QueryInput {
            headers: [(String::from("Accept"), String::from("  "))].into(),
            params: Default::default(),
        };
        let err = svc
            .fetch(
                &recipient(),
                &"https://provider.example/artifacts/1".parse().unwrap(),
                None,
                resource_id,
                Some(&query),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::Validation(ValidationError::InvalidQueryInput(_))
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn describe_discovery_returns_raw_payload_without_persisting() {
        let transport = Arc::new(ScriptedTransport::new(envelope_body(
            "ids:DescriptionResponseMessage",
            "{\"@type\":\"ids:BaseConnector\"}",
        )));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport, store.clone());

        let outcome = svc.describe(&recipient(), None).await.unwrap();
        match outcome {
            DescribeOutcome::SelfDescription { payload } => {
                assert!(payload.contains("ids:BaseConnector"));
            }
            other => panic!("expected self-description, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn describe_rejection_is_a_normal_outcome() {
        let transport = Arc::new(ScriptedTransport::new(envelope_body(
            "ids:RejectionMessage",
            "NOT_AUTHORIZED",
        )));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport, store.clone());

        let outcome = svc.describe(&recipient(), None).await.unwrap();
        match outcome {
            DescribeOutcome::Rejected(rejection) => {
                assert!(rejection.message().contains("NOT_AUTHORIZED"));
                assert!(matches!(rejection, Rejection::Generic { .. }));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn negotiate_with_unparsable_agreement_id_attempts_no_confirmation() {
        // One scripted response: the agreement header with a junk payload.
        // If a confirmation were attempted, the transport would see 2 calls.
        let transport = Arc::new(ScriptedTransport::new(envelope_body(
            "ids:ContractAgreementMessage",
            "no id in here",
        )));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport.clone(), store);

        let offer = serde_json::json!({
            "ids:permission": [{"ids:action": ["idsc:USE"]}]
        })
        .to_string();
        let err = svc
            .negotiate(
                &recipient(),
                &"https://provider.example/artifacts/1".parse().unwrap(),
                &offer,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::Negotiation(NegotiationError::InvalidAgreement(_))
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn negotiate_contract_rejection_embeds_payload() {
        let transport = Arc::new(ScriptedTransport::new(envelope_body(
            "ids:ContractRejectionMessage",
            "MALFORMED_MESSAGE",
        )));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport, store);

        let offer = serde_json::json!({
            "ids:permission": [{"ids:action": ["idsc:USE"]}]
        })
        .to_string();
        let outcome = svc
            .negotiate(
                &recipient(),
                &"https://provider.example/artifacts/1".parse().unwrap(),
                &offer,
            )
            .await
            .unwrap();

        match outcome {
            NegotiateOutcome::Rejected(rejection) => {
                assert!(matches!(rejection, Rejection::Contract { .. }));
                assert!(rejection.message().contains("MALFORMED_MESSAGE"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unexpected_header_is_reported_verbatim() {
        let transport = Arc::new(ScriptedTransport::new(envelope_body(
            "ids:SomeFutureMessage",
            "mystery",
        )));
        let store = Arc::new(MemoryStore::new());
        let svc = service(transport, store);

        let outcome = svc.describe(&recipient(), None).await.unwrap();
        match outcome {
            DescribeOutcome::Rejected(Rejection::Unexpected { header, payload }) => {
                assert_eq!(header.message_type, "ids:SomeFutureMessage");
                assert_eq!(payload, "mystery");
            }
            other => panic!("expected unexpected-header outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_build_failure_surfaces_as_message_error() {
        struct Refusing;
        #[async_trait]
        impl MessageTransport for Refusing {
            async fn send_and_receive(
                &self,
                _recipient: &Url,
                _message: &WireMessage,
            ) -> std::result::Result<String, TransportFailure> {
                Err(TransportFailure::Send("connection refused".into()))
            }
        }
        let svc = service(Arc::new(Refusing), Arc::new(MemoryStore::new()));
        let err = svc.describe(&recipient(), None).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Message(MessageError::Build { .. })
        ));
    }
}
