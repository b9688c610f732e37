use super::types::ResponseHeader;

/// The protocol phase a response is being read in. Each phase accepts
/// exactly one success header type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Description,
    Contract,
    Artifact,
}

impl Phase {
    const fn expected_type(self) -> &'static str {
        match self {
            Self::Description => "ids:DescriptionResponseMessage",
            Self::Contract => "ids:ContractAgreementMessage",
            Self::Artifact => "ids:ArtifactResponseMessage",
        }
    }
}

/// Closed classification of a response header.
///
/// A misbehaving peer must not crash the exchange, so any header that is
/// neither the phase's success type nor a rejection maps to `Unexpected`
/// rather than an error. Callers treat `Unexpected` as a non-fatal but
/// unsuccessful outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    DescriptionResponse,
    ContractAgreement,
    ArtifactResponse,
    ContractRejection,
    Rejection,
    Unexpected { received: String },
}

/// Pure and total over all header shapes.
pub fn classify(header: &ResponseHeader, phase: Phase) -> Classification {
    let message_type = header.message_type.as_str();
    if message_type == phase.expected_type() {
        return match phase {
            Phase::Description => Classification::DescriptionResponse,
            Phase::Contract => Classification::ContractAgreement,
            Phase::Artifact => Classification::ArtifactResponse,
        };
    }
    match message_type {
        "ids:ContractRejectionMessage" => Classification::ContractRejection,
        "ids:RejectionMessage" => Classification::Rejection,
        other => Classification::Unexpected {
            received: other.to_string(),
        },
    }
}
