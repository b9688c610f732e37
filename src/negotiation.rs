use crate::error::{MessageError, NegotiationError};
use crate::messages::{
    classify, Classification, Envelope, MessageKind, Phase, RequestDispatcher, RequestFields,
};
use serde::Serialize;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// A contract request built from a caller-supplied offer, bound to the
/// target artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ContractRequest {
    #[serde(rename = "@type")]
    type_tag: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "ids:permission")]
    pub permission: Vec<serde_json::Value>,
}

impl ContractRequest {
    /// Serialized form sent as the contract-request payload.
    pub fn to_document(&self) -> String {
        // A struct of owned JSON values cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of reading the contract-phase response.
#[derive(Debug, Clone)]
pub enum Interpretation {
    Agreed { agreement_id: Url },
    Rejected { classification: Classification },
}

/// Drives the contract phase: `Offered → Requested → Agreed | Rejected`,
/// and for an accepted agreement the closing `Confirmed` step.
///
/// The engine holds no state between invocations; every transition is a
/// method call and every failure mode is a distinct error variant.
pub struct NegotiationEngine {
    dispatcher: Arc<RequestDispatcher>,
}

impl NegotiationEngine {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Parses the caller-supplied offer document and binds every permission
    /// to the target artifact. Local validation only; nothing is sent.
    pub fn build_contract_request(
        offer_document: &str,
        artifact_id: &Url,
    ) -> Result<ContractRequest, NegotiationError> {
        let offer: serde_json::Value = serde_json::from_str(offer_document)
            .map_err(|e| NegotiationError::InvalidOffer(format!("offer is not valid json: {e}")))?;

        let permissions = offer
            .get("ids:permission")
            .and_then(serde_json::Value::as_array)
            .filter(|list| !list.is_empty())
            .ok_or_else(|| {
                NegotiationError::InvalidOffer(
                    "offer carries no permission to bind to the artifact".into(),
                )
            })?;

        let permission = permissions
            .iter()
            .map(|entry| {
                let mut bound = entry.clone();
                let fields = bound.as_object_mut().ok_or_else(|| {
                    NegotiationError::InvalidOffer("offer permission is not an object".into())
                })?;
                fields.insert(
                    "ids:target".into(),
                    serde_json::Value::String(artifact_id.to_string()),
                );
                Ok(bound)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContractRequest {
            type_tag: "ids:ContractRequest",
            id: format!("urn:contractrequest:{}", Uuid::new_v4()),
            permission,
        })
    }

    /// Sends the contract request and returns the raw envelope.
    pub async fn submit(
        &self,
        recipient: &Url,
        request: &ContractRequest,
    ) -> Result<Envelope, MessageError> {
        self.dispatcher
            .send(
                recipient,
                MessageKind::ContractRequest,
                RequestFields::default(),
                request.to_document(),
            )
            .await
    }

    /// Classifies the contract-phase response and, for an agreement, extracts
    /// the agreement identifier from the payload. A malformed agreement is
    /// terminal: the peer's response was inherently unusable.
    pub fn interpret(&self, envelope: &Envelope) -> Result<Interpretation, NegotiationError> {
        match classify(&envelope.header, Phase::Contract) {
            Classification::ContractAgreement => {
                let agreement_id = Self::extract_agreement_id(&envelope.payload)?;
                Ok(Interpretation::Agreed { agreement_id })
            }
            classification => Ok(Interpretation::Rejected { classification }),
        }
    }

    /// Acknowledges an accepted agreement back to the recipient. The
    /// negotiation is complete only once this succeeds; a delivery failure
    /// leaves it observably incomplete.
    pub async fn confirm(
        &self,
        recipient: &Url,
        agreement_id: &Url,
        agreement_payload: String,
    ) -> Result<Url, NegotiationError> {
        self.dispatcher
            .send(
                recipient,
                MessageKind::ContractAgreement,
                RequestFields {
                    transfer_contract: Some(agreement_id.clone()),
                    ..RequestFields::default()
                },
                agreement_payload,
            )
            .await
            .map_err(|e| NegotiationError::Confirmation {
                agreement_id: agreement_id.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(%agreement_id, "contract agreement confirmed");
        Ok(agreement_id.clone())
    }

    fn extract_agreement_id(payload: &str) -> Result<Url, NegotiationError> {
        let agreement: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
            NegotiationError::InvalidAgreement(format!("agreement payload is not valid json: {e}"))
        })?;
        agreement
            .get("@id")
            .and_then(serde_json::Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                NegotiationError::InvalidAgreement(
                    "agreement payload carries no parsable @id".into(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ResponseHeader;

    fn artifact() -> Url {
        "https://provider.example/artifacts/5e7f1a2c-90ab-4cde-8123-456789abcdef"
            .parse()
            .unwrap()
    }

    fn offer() -> String {
        serde_json::json!({
            "@type": "ids:ContractOffer",
            "ids:permission": [
                {"ids:action": ["idsc:USE"]}
            ]
        })
        .to_string()
    }

    fn envelope(message_type: &str, payload: &str) -> Envelope {
        Envelope {
            header: ResponseHeader {
                message_type: message_type.to_string(),
                id: Some("urn:message:1".into()),
                rejection_reason: None,
                correlation_message: None,
                extra: serde_json::Map::new(),
            },
            payload: payload.to_string(),
        }
    }

    #[test]
    fn build_binds_permissions_to_the_artifact() {
        let request = NegotiationEngine::build_contract_request(&offer(), &artifact()).unwrap();
        assert_eq!(request.permission.len(), 1);
        assert_eq!(
            request.permission[0]["ids:target"],
            artifact().to_string()
        );
        assert!(request.id.starts_with("urn:contractrequest:"));

        let document = request.to_document();
        assert!(document.contains("ids:ContractRequest"));
        assert!(document.contains(artifact().as_str()));
    }

    #[test]
    fn build_rejects_unparsable_offer() {
        let err = NegotiationEngine::build_contract_request("not json", &artifact()).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidOffer(_)));
    }

    #[test]
    fn build_rejects_offer_without_permissions() {
        let bare = r#"{"@type": "ids:ContractOffer"}"#;
        let err = NegotiationEngine::build_contract_request(bare, &artifact()).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidOffer(_)));

        let empty = r#"{"@type": "ids:ContractOffer", "ids:permission": []}"#;
        let err = NegotiationEngine::build_contract_request(empty, &artifact()).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidOffer(_)));
    }

    fn engine() -> NegotiationEngine {
        // interpret() never touches the wire, so the transport is irrelevant.
        struct NoTransport;
        #[async_trait::async_trait]
        impl crate::messages::MessageTransport for NoTransport {
            async fn send_and_receive(
                &self,
                _recipient: &Url,
                _message: &crate::messages::WireMessage,
            ) -> Result<String, crate::messages::TransportFailure> {
                Err(crate::messages::TransportFailure::Send("unused".into()))
            }
        }
        NegotiationEngine::new(Arc::new(RequestDispatcher::new(
            Arc::new(NoTransport),
            "https://consumer.example/connector".parse().unwrap(),
            "4.0.0",
        )))
    }

    #[test]
    fn interpret_extracts_agreement_id() {
        let payload = serde_json::json!({
            "@type": "ids:ContractAgreement",
            "@id": "https://provider.example/agreements/77"
        })
        .to_string();
        let got = engine()
            .interpret(&envelope("ids:ContractAgreementMessage", &payload))
            .unwrap();
        assert!(matches!(
            got,
            Interpretation::Agreed { agreement_id }
                if agreement_id.as_str() == "https://provider.example/agreements/77"
        ));
    }

    #[test]
    fn interpret_fails_on_agreement_without_id() {
        let err = engine()
            .interpret(&envelope("ids:ContractAgreementMessage", "{}"))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidAgreement(_)));
    }

    #[test]
    fn interpret_fails_on_unparsable_agreement_payload() {
        let err = engine()
            .interpret(&envelope("ids:ContractAgreementMessage", "<rdf/>"))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidAgreement(_)));
    }

    #[test]
    fn interpret_passes_rejections_through() {
        let got = engine()
            .interpret(&envelope("ids:ContractRejectionMessage", "no deal"))
            .unwrap();
        assert!(matches!(
            got,
            Interpretation::Rejected {
                classification: Classification::ContractRejection
            }
        ));
    }

    #[test]
    fn interpret_treats_unknown_headers_as_rejected_not_fatal() {
        let got = engine()
            .interpret(&envelope("ids:SomethingElse", ""))
            .unwrap();
        assert!(matches!(
            got,
            Interpretation::Rejected {
                classification: Classification::Unexpected { .. }
            }
        ));
    }

    #[tokio::test]
    async fn confirm_failure_names_the_agreement() {
        let agreement: Url = "https://provider.example/agreements/77".parse().unwrap();
        let err = engine()
            .confirm(
                &"https://provider.example/api/ids/data".parse().unwrap(),
                &agreement,
                "{}".into(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::Confirmation { agreement_id, .. } if agreement_id == agreement
        ));
    }
}
