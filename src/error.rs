use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the exchange engine.
///
/// Each protocol phase defines its own error variant. Callers match on these
/// to decide recovery strategy; the binary edges continue to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ExchangeError {
    // ── Message build / response read ───────────────────────────────────
    #[error("message: {0}")]
    Message(#[from] MessageError),

    // ── Contract negotiation ────────────────────────────────────────────
    #[error("negotiation: {0}")]
    Negotiation(#[from] NegotiationError),

    // ── Description translation ─────────────────────────────────────────
    #[error("translation: {0}")]
    Translation(#[from] TranslationError),

    // ── Local input validation ──────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Persistence collaborator ────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Message errors ──────────────────────────────────────────────────────────

/// Transport/codec-phase failures. Always surfaced, never retried here;
/// the caller owns retry policy.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("failed to build {kind} message: {reason}")]
    Build { kind: String, reason: String },

    #[error("failed to read the response message: {0}")]
    ResponseRead(String),
}

// ─── Negotiation errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Local validation of the caller-supplied offer. Never sent over the wire.
    #[error("invalid contract offer: {0}")]
    InvalidOffer(String),

    /// The peer answered with an agreement header whose payload carries no
    /// usable agreement. Terminal for the negotiation.
    #[error("received invalid contract agreement: {0}")]
    InvalidAgreement(String),

    /// An agreement was reached but the confirmation could not be delivered.
    /// The negotiation is explicitly not complete.
    #[error("negotiation sequence was not fully completed for agreement {agreement_id}: {reason}")]
    Confirmation {
        agreement_id: url::Url,
        reason: String,
    },
}

// ─── Translation errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("resource {resource_id} could not be resolved from the response")]
    UnresolvableResource { resource_id: url::Url },

    #[error("metadata could not be deserialized: {0}")]
    MetadataDeserialization(String),
}

// ─── Validation errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid query input: {0}")]
    InvalidQueryInput(String),
}

// ─── Store errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ExchangeError>;
