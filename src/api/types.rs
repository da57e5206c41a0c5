use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/verify-token`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    /// Bearer credential extracted from the relay token.
    #[serde(alias = "token")]
    pub credential: String,
    /// Hostname the relay token was minted on.
    #[serde(default)]
    pub source_domain: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyTokenResponse {
    #[must_use]
    pub fn verified(principal_id: String, role: Option<String>) -> Self {
        Self {
            success: true,
            principal_id: Some(principal_id),
            role,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            principal_id: None,
            role: None,
            error: Some(error.into()),
        }
    }
}

/// Answer of the upstream token-verification endpoint.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpstreamVerifyResponse {
    #[serde(alias = "uid", alias = "sub")]
    pub principal_id: String,
}
