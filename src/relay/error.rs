use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing credential")]
    MissingCredential,
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(#[from] ProviderError),
    #[error("invalid token: {0}")]
    Decode(#[from] DecodeError),
    #[error("token expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },
    #[error("handoff failed: {0}")]
    HandoffFailed(#[from] HandoffError),
    #[error("could not serialize token")]
    Encode(#[source] serde_json::Error),
}

/// Reasons an encoded token could not be turned back into a record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64url encoding")]
    Encoding,
    #[error("token too short")]
    TooShort,
    #[error("integrity check failed")]
    Integrity,
    #[error("invalid token record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid validity window")]
    InvalidWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("no authenticated principal")]
    Unauthenticated,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandoffError {
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("verification backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid verification response: {0}")]
    InvalidResponse(String),
}
