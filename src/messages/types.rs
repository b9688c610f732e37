use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// The outbound message kinds the connector sends. The serialized form is the
/// `@type` discriminator on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MessageKind {
    #[strum(serialize = "ids:DescriptionRequestMessage")]
    DescriptionRequest,
    #[strum(serialize = "ids:ContractRequestMessage")]
    ContractRequest,
    #[strum(serialize = "ids:ContractAgreementMessage")]
    ContractAgreement,
    #[strum(serialize = "ids:ArtifactRequestMessage")]
    ArtifactRequest,
}

/// Kind-specific fields bound into the outbound header.
#[derive(Debug, Clone, Default)]
pub struct RequestFields {
    /// Element whose description is requested; absent for a self-description.
    pub requested_element: Option<Url>,
    /// Artifact whose data is requested.
    pub requested_artifact: Option<Url>,
    /// Agreement under which the transfer happens.
    pub transfer_contract: Option<Url>,
}

/// Header of an outbound protocol message.
#[derive(Debug, Clone, Serialize)]
pub struct RequestHeader {
    #[serde(rename = "@type")]
    pub message_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "ids:modelVersion")]
    pub model_version: String,
    #[serde(rename = "ids:issued")]
    pub issued: DateTime<Utc>,
    #[serde(rename = "ids:issuerConnector")]
    pub issuer_connector: Url,
    #[serde(rename = "ids:recipientConnector")]
    pub recipient_connector: Url,
    #[serde(rename = "ids:requestedElement", skip_serializing_if = "Option::is_none")]
    pub requested_element: Option<Url>,
    #[serde(rename = "ids:requestedArtifact", skip_serializing_if = "Option::is_none")]
    pub requested_artifact: Option<Url>,
    #[serde(rename = "ids:transferContract", skip_serializing_if = "Option::is_none")]
    pub transfer_contract: Option<Url>,
}

impl RequestHeader {
    pub fn new(
        kind: MessageKind,
        issuer_connector: Url,
        recipient_connector: Url,
        model_version: impl Into<String>,
        fields: RequestFields,
    ) -> Self {
        Self {
            message_type: kind.to_string(),
            id: format!("urn:message:{}", Uuid::new_v4()),
            model_version: model_version.into(),
            issued: Utc::now(),
            issuer_connector,
            recipient_connector,
            requested_element: fields.requested_element,
            requested_artifact: fields.requested_artifact,
            transfer_contract: fields.transfer_contract,
        }
    }
}

/// Header of a response as the peer sent it. Only the fields the engine
/// inspects are typed; everything else is kept raw so an unexpected header
/// can be reported verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    #[serde(rename = "@type")]
    pub message_type: String,
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "ids:rejectionReason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rejection_reason: Option<String>,
    #[serde(
        rename = "ids:correlationMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A fully built outbound message: header plus payload, serialized as one
/// JSON object for transmission.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub header: RequestHeader,
    pub payload: String,
}

/// The header+payload pair extracted from a protocol response.
///
/// Both fields are mandatory and validated once at construction; callers
/// never probe a raw map for message parts.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub header: ResponseHeader,
    pub payload: String,
}

impl Envelope {
    /// Parses a raw response body into an envelope. Fails when the body is
    /// not a JSON object carrying both a `header` object and a string
    /// `payload`.
    pub fn from_response_body(body: &str) -> Result<Self, String> {
        #[derive(Deserialize)]
        struct RawEnvelope {
            header: ResponseHeader,
            payload: String,
        }

        let raw: RawEnvelope = serde_json::from_str(body)
            .map_err(|e| format!("response is not a header/payload envelope: {e}"))?;
        Ok(Self {
            header: raw.header,
            payload: raw.payload,
        })
    }
}
