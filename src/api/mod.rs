//! Relying-party backend: the HTTP endpoint relayed credentials are handed to,
//! plus the HTTP clients that talk to it and to the upstream identity provider.

pub mod client;
pub mod handlers;
pub mod roles;
pub mod types;

pub use client::{BackendVerifier, UpstreamVerifier};
pub use handlers::VerifyState;
pub use roles::StaticRoleStore;

use crate::api::handlers::{health, verify};
use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(verify::verify_token));

    let mut relay_tag = Tag::new("relay");
    relay_tag.description = Some("Relayed credential verification".to_string());
    router.get_openapi_mut().tags = Some(vec![relay_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let description = env!("CARGO_PKG_DESCRIPTION").trim();
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description((!description.is_empty()).then_some(description))
        .build();

    OpenApiBuilder::new().info(info).build()
}

/// Application router with request ids, tracing and CORS applied.
#[must_use]
pub fn router(state: Arc<VerifyState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let (router, _openapi) = api_router().split_for_parts();
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(state)),
    )
}

/// Serve the backend until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: Arc<VerifyState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::VerifyTokenResponse;
    use crate::relay::{
        BoxFuture, CredentialVerifier, HandoffError, ProviderError, Role, RoleStore, Verification,
    };
    use axum::{
        body::to_bytes,
        http::{header::CACHE_CONTROL, StatusCode},
    };
    use secrecy::{ExposeSecret, SecretString};
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct StubUpstream;

    impl CredentialVerifier for StubUpstream {
        fn verify<'a>(
            &'a self,
            credential: &'a SecretString,
            _source_domain: &'a str,
        ) -> BoxFuture<'a, Result<Verification, HandoffError>> {
            let result = match credential.expose_secret() {
                "admin-credential" => Ok(Verification {
                    principal_id: "uid-admin".to_string(),
                    role: None,
                }),
                "viewer-credential" => Ok(Verification {
                    principal_id: "uid-viewer".to_string(),
                    role: None,
                }),
                "down" => Err(HandoffError::Unavailable("timeout".to_string())),
                _ => Err(HandoffError::Rejected("unknown".to_string())),
            };
            Box::pin(async move { result })
        }
    }

    struct FailingRoles;

    impl RoleStore for FailingRoles {
        fn role<'a>(
            &'a self,
            _principal_id: &'a str,
        ) -> BoxFuture<'a, Result<Option<Role>, ProviderError>> {
            Box::pin(async { Err(ProviderError::Unavailable("db down".to_string())) })
        }
    }

    fn roles() -> StaticRoleStore {
        StaticRoleStore::new(HashMap::from([
            ("uid-admin".to_string(), Role::new("admin")),
            ("uid-viewer".to_string(), Role::new("viewer")),
        ]))
    }

    fn app(required_role: Option<&str>) -> Router {
        let state = VerifyState::new(Arc::new(StubUpstream), Arc::new(roles()))
            .with_required_role(required_role.map(Role::new));
        router(Arc::new(state))
    }

    async fn post_verify(app: Router, body: &str) -> Result<(StatusCode, VerifyTokenResponse)> {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/verify-token")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))?,
            )
            .await?;

        let status = response.status();
        assert_eq!(
            response.headers().get(CACHE_CONTROL).map(HeaderValue::as_bytes),
            Some(&b"no-store"[..])
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn verify_token_returns_principal_and_role() -> Result<()> {
        let (status, body) = post_verify(
            app(None),
            r#"{"credential":"viewer-credential","sourceDomain":"a.example"}"#,
        )
        .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            VerifyTokenResponse::verified("uid-viewer".to_string(), Some("viewer".to_string()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_enforces_required_role() -> Result<()> {
        let (status, body) = post_verify(
            app(Some("admin")),
            r#"{"credential":"viewer-credential","sourceDomain":"a.example"}"#,
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!body.success);

        let (status, body) = post_verify(
            app(Some("admin")),
            r#"{"token":"admin-credential","sourceDomain":"a.example"}"#,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.role.as_deref(), Some("admin"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_rejects_unknown_credential() -> Result<()> {
        let (status, body) = post_verify(app(None), r#"{"credential":"forged"}"#).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error.as_deref(), Some("invalid credential"));
        assert_eq!(body.principal_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_reports_upstream_outage() -> Result<()> {
        let (status, _) = post_verify(app(None), r#"{"credential":"down"}"#).await?;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_reports_role_store_outage() -> Result<()> {
        let state = VerifyState::new(Arc::new(StubUpstream), Arc::new(FailingRoles));
        let (status, _) = post_verify(
            router(Arc::new(state)),
            r#"{"credential":"admin-credential"}"#,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_rejects_bad_payloads() -> Result<()> {
        let (status, body) = post_verify(app(None), r#"{"credential":"  "}"#).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("missing credential"));

        let (status, _) = post_verify(app(None), "not json").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_package() -> Result<()> {
        let response = app(None)
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        Ok(())
    }

    #[test]
    fn openapi_documents_verify_endpoint() {
        let openapi = openapi();
        assert!(openapi.paths.paths.contains_key("/api/verify-token"));
        assert!(openapi.paths.paths.contains_key("/health"));
    }
}
