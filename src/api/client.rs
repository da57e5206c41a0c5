//! HTTP implementations of [`CredentialVerifier`].
//!
//! - [`BackendVerifier`] is what a relying-party page hands relayed
//!   credentials to: it calls this crate's `/api/verify-token` endpoint.
//! - [`UpstreamVerifier`] is what that endpoint itself uses to check the
//!   credential with the identity provider's verification API.
//!
//! Neither logs the credential.

use crate::api::types::{UpstreamVerifyResponse, VerifyTokenRequest, VerifyTokenResponse};
use crate::relay::{BoxFuture, CredentialVerifier, HandoffError, Role, Verification};
use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Request timeout applied to verification calls.
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
/// Maximum number of error body characters kept in errors.
const MAX_ERROR_CHARS: usize = 200;

pub const VERIFY_TOKEN_PATH: &str = "/api/verify-token";

fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
        .build()
        .context("Error creating reqwest client")
}

fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

/// Client for the relying party's `/api/verify-token` endpoint.
#[derive(Debug, Clone)]
pub struct BackendVerifier {
    client: Client,
    url: String,
}

impl BackendVerifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: build_url_with_base(base_url, VERIFY_TOKEN_PATH),
        })
    }

    #[instrument(skip(self, credential))]
    async fn post(
        &self,
        credential: &SecretString,
        source_domain: &str,
    ) -> Result<Verification, HandoffError> {
        let request = VerifyTokenRequest {
            credential: credential.expose_secret().to_string(),
            source_domain: source_domain.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                error!("Error calling verification backend: {err}");
                HandoffError::Unavailable(err.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| HandoffError::Unavailable(err.to_string()))?;
        let parsed = serde_json::from_str::<VerifyTokenResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|response| response.error)
                .unwrap_or_else(|| sanitize_body(&body));
            return if status.is_client_error() {
                Err(HandoffError::Rejected(message))
            } else {
                Err(HandoffError::Unavailable(format!("{status}: {message}")))
            };
        }

        let response = parsed.map_err(|err| HandoffError::InvalidResponse(err.to_string()))?;
        if !response.success {
            return Err(HandoffError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "verification failed".to_string()),
            ));
        }

        let principal_id = response
            .principal_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| HandoffError::InvalidResponse("missing principalId".to_string()))?;

        debug!("Backend verified principal {principal_id}");
        Ok(Verification {
            principal_id,
            role: response.role.map(Role::new),
        })
    }
}

impl CredentialVerifier for BackendVerifier {
    fn verify<'a>(
        &'a self,
        credential: &'a SecretString,
        source_domain: &'a str,
    ) -> BoxFuture<'a, Result<Verification, HandoffError>> {
        Box::pin(self.post(credential, source_domain))
    }
}

/// Client for the identity provider's token-verification endpoint
/// (`POST {base}/verify` with `{"token": ...}`).
#[derive(Debug, Clone)]
pub struct UpstreamVerifier {
    client: Client,
    url: String,
}

impl UpstreamVerifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: build_url_with_base(base_url, "/verify"),
        })
    }

    #[instrument(skip(self, credential))]
    async fn post(
        &self,
        credential: &SecretString,
        source_domain: &str,
    ) -> Result<Verification, HandoffError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "token": credential.expose_secret() }))
            .send()
            .await
            .map_err(|err| {
                error!("Error validating credential upstream: {err}");
                HandoffError::Unavailable(err.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!("Upstream rejected credential relayed from {source_domain}");
            return Err(HandoffError::Rejected("invalid credential".to_string()));
        }
        if !status.is_success() {
            error!("Credential validation failed upstream: {status}");
            return Err(HandoffError::Unavailable(status.to_string()));
        }

        let body: UpstreamVerifyResponse = response
            .json()
            .await
            .map_err(|err| HandoffError::InvalidResponse(err.to_string()))?;

        if body.principal_id.is_empty() {
            return Err(HandoffError::InvalidResponse(
                "empty principal id".to_string(),
            ));
        }

        Ok(Verification {
            principal_id: body.principal_id,
            role: None,
        })
    }
}

impl CredentialVerifier for UpstreamVerifier {
    fn verify<'a>(
        &'a self,
        credential: &'a SecretString,
        source_domain: &'a str,
    ) -> BoxFuture<'a, Result<Verification, HandoffError>> {
        Box::pin(self.post(credential, source_domain))
    }
}
