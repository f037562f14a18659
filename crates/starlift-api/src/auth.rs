//! # Authentication Middleware
//!
//! Single shared-secret bearer token for the operator control plane, and
//! the same token for socket handshakes (instances put it in the hello
//! frame, clients pass it as a query parameter — browsers cannot set
//! headers on WebSocket upgrades).
//!
//! Token comparison is constant-time. When no token is configured, auth
//! is disabled and every request is allowed (development mode).

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{ErrorBody, ErrorDetail};

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthConfig {
    /// Whether `provided` matches the configured token. Always true when
    /// auth is disabled.
    pub fn accepts(&self, provided: Option<&str>) -> bool {
        match (&self.token, provided) {
            (None, _) => true,
            (Some(expected), Some(provided)) => constant_time_token_eq(provided, expected),
            (Some(_), None) => false,
        }
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, a dummy comparison keeps timing independent of
/// where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Extract and validate the bearer token from the Authorization header.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request.extensions().get::<AuthConfig>().cloned();

    let Some(config) = config else {
        return next.run(request).await;
    };
    if config.token.is_none() {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => {
            if config.accepts(Some(&value[7..])) {
                next.run(request).await
            } else {
                tracing::warn!("authentication failed: invalid bearer token");
                unauthorized_response("invalid bearer token")
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(token: Option<String>) -> Router {
        let auth_config = AuthConfig { token };
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let app = test_app(Some("my-secret".to_string()));
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer my-secret")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(Some("my-secret".to_string()));
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn invalid_token_rejected() {
        let app = test_app(Some("my-secret".to_string()));
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(Some("my-secret".to_string()));
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_disabled_allows_all_requests() {
        let app = test_app(None);
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn constant_time_eq_accepts_identical() {
        assert!(constant_time_token_eq("secret-token-123", "secret-token-123"));
    }

    #[test]
    fn constant_time_eq_rejects_wrong_prefix_and_empty() {
        assert!(!constant_time_token_eq("wrong-token", "secret-token-123"));
        assert!(!constant_time_token_eq("secret", "secret-token-123"));
        assert!(!constant_time_token_eq("", "secret-token-123"));
    }

    #[test]
    fn accepts_handles_all_configurations() {
        let disabled = AuthConfig { token: None };
        assert!(disabled.accepts(None));
        assert!(disabled.accepts(Some("anything")));

        let enabled = AuthConfig {
            token: Some("secret".to_string()),
        };
        assert!(enabled.accepts(Some("secret")));
        assert!(!enabled.accepts(Some("other")));
        assert!(!enabled.accepts(None));
    }
}
