//! `POST /api/verify-token`: the relying party's independent check of a relayed credential.
//!
//! Flow:
//! 1) Validate the request body.
//! 2) Verify the credential with the upstream identity provider.
//! 3) Resolve the principal's role and enforce the required role, if any.
//!
//! The relay token itself is never trusted here; only the credential it
//! carried is, after the upstream confirms it.

use crate::api::types::{VerifyTokenRequest, VerifyTokenResponse};
use crate::relay::{CredentialVerifier, HandoffError, Role, RoleStore};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::CACHE_CONTROL, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Collaborators of the verification endpoint.
pub struct VerifyState {
    upstream: Arc<dyn CredentialVerifier>,
    roles: Arc<dyn RoleStore>,
    required_role: Option<Role>,
}

impl VerifyState {
    #[must_use]
    pub fn new(upstream: Arc<dyn CredentialVerifier>, roles: Arc<dyn RoleStore>) -> Self {
        Self {
            upstream,
            roles,
            required_role: None,
        }
    }

    #[must_use]
    pub fn with_required_role(mut self, role: Option<Role>) -> Self {
        self.required_role = role;
        self
    }
}

type VerifyResponse = (StatusCode, HeaderMap, Json<VerifyTokenResponse>);

fn respond(status: StatusCode, body: VerifyTokenResponse) -> VerifyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    (status, headers, Json(body))
}

#[utoipa::path(
    post,
    path= "/api/verify-token",
    request_body = VerifyTokenRequest,
    responses (
        (status = 200, description = "Credential verified", body = VerifyTokenResponse),
        (status = 400, description = "Missing or malformed credential", body = VerifyTokenResponse),
        (status = 401, description = "Credential rejected by the identity provider", body = VerifyTokenResponse),
        (status = 403, description = "Principal lacks the required role", body = VerifyTokenResponse),
        (status = 502, description = "Identity provider or role store unavailable", body = VerifyTokenResponse),
    ),
    tag = "relay",
)]
#[instrument(skip(state, payload))]
pub async fn verify_token(
    Extension(state): Extension<Arc<VerifyState>>,
    payload: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> VerifyResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(err) => {
            debug!("Invalid verify-token payload: {err}");
            return respond(
                StatusCode::BAD_REQUEST,
                VerifyTokenResponse::failed("invalid request"),
            );
        }
    };

    if request.credential.trim().is_empty() {
        return respond(
            StatusCode::BAD_REQUEST,
            VerifyTokenResponse::failed("missing credential"),
        );
    }

    let source_domain = request.source_domain;
    let credential = SecretString::from(request.credential);

    let verification = match state.upstream.verify(&credential, &source_domain).await {
        Ok(verification) => verification,
        Err(HandoffError::Rejected(reason)) => {
            warn!("Credential relayed from {source_domain} rejected: {reason}");
            return respond(
                StatusCode::UNAUTHORIZED,
                VerifyTokenResponse::failed("invalid credential"),
            );
        }
        Err(err) => {
            error!("Upstream verification failed: {err}");
            return respond(
                StatusCode::BAD_GATEWAY,
                VerifyTokenResponse::failed("verification unavailable"),
            );
        }
    };

    let role = match state.roles.role(&verification.principal_id).await {
        Ok(role) => role,
        Err(err) => {
            error!("Role lookup failed: {err}");
            return respond(
                StatusCode::BAD_GATEWAY,
                VerifyTokenResponse::failed("role lookup unavailable"),
            );
        }
    };

    if let Some(required) = &state.required_role {
        if role.as_ref() != Some(required) {
            warn!(
                principal_id = %verification.principal_id,
                "Principal lacks required role {required}"
            );
            return respond(
                StatusCode::FORBIDDEN,
                VerifyTokenResponse::failed("insufficient role"),
            );
        }
    }

    info!(
        principal_id = %verification.principal_id,
        source_domain = %source_domain,
        "Relayed credential accepted"
    );

    respond(
        StatusCode::OK,
        VerifyTokenResponse::verified(
            verification.principal_id,
            role.map(|role| role.as_str().to_string()),
        ),
    )
}
