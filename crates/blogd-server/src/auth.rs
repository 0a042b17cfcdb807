// ABOUTME: Shared-secret access guards for privileged and api-key routes.
// ABOUTME: A tower Layer compares one request header against a configured secret; no secret means open access.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};

use crate::envelope::ApiError;

/// Header carrying the admin secret.
pub const ADMIN_HEADER: &str = "x-admin-token";
/// Header carrying the integration api key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Decides whether a provided secret grants access. Stateless: every call
/// re-checks the secret.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    secret: Option<Arc<str>>,
}

impl AccessGuard {
    /// An absent or empty secret leaves the guard open.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn authorize(&self, provided: Option<&str>) -> Access {
        match (&self.secret, provided) {
            (None, _) => Access::Allow,
            (Some(secret), Some(provided)) if provided == &**secret => Access::Allow,
            _ => Access::Deny,
        }
    }
}

/// A tower Layer that rejects requests whose header does not match the guard.
#[derive(Clone)]
pub struct AccessLayer {
    guard: AccessGuard,
    header: HeaderName,
    reason: &'static str,
}

impl AccessLayer {
    pub fn new(guard: AccessGuard, header: &'static str, reason: &'static str) -> Self {
        Self {
            guard,
            header: HeaderName::from_static(header),
            reason,
        }
    }

    /// Guard for administrative routes, checked against `X-Admin-Token`.
    pub fn admin(secret: Option<&str>) -> Self {
        Self::new(AccessGuard::new(secret), ADMIN_HEADER, "invalid admin token")
    }

    /// Guard for integration routes, checked against `X-API-Key`.
    pub fn api_key(secret: Option<&str>) -> Self {
        Self::new(AccessGuard::new(secret), API_KEY_HEADER, "invalid api key")
    }
}

impl<S> Layer<S> for AccessLayer {
    type Service = AccessMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessMiddleware {
            inner,
            guard: self.guard.clone(),
            header: self.header.clone(),
            reason: self.reason,
        }
    }
}

/// The middleware service produced by [`AccessLayer`].
#[derive(Clone)]
pub struct AccessMiddleware<S> {
    inner: S,
    guard: AccessGuard,
    header: HeaderName,
    reason: &'static str,
}

impl<S> Service<Request<Body>> for AccessMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let provided = req
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok());

        match self.guard.authorize(provided) {
            Access::Allow => {
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await })
            }
            Access::Deny => {
                tracing::warn!("denied {} {}: {}", req.method(), req.uri().path(), self.reason);
                let resp = ApiError::Unauthorized(self.reason.to_string()).into_response();
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    fn test_router(secret: Option<&str>) -> Router {
        let guarded = Router::new()
            .route("/private", get(|| async { "private" }))
            .route_layer(AccessLayer::admin(secret));
        Router::new()
            .route("/public", get(|| async { "public" }))
            .merge(guarded)
    }

    async fn status(app: Router, req: Request<Body>) -> StatusCode {
        app.oneshot(req).await.unwrap().status()
    }

    #[test]
    fn guard_without_secret_allows_everything() {
        for secret in [None, Some("")] {
            let guard = AccessGuard::new(secret);
            assert!(guard.is_open());
            assert_eq!(guard.authorize(None), Access::Allow);
            assert_eq!(guard.authorize(Some("anything")), Access::Allow);
        }
    }

    #[test]
    fn guard_requires_exact_match() {
        let guard = AccessGuard::new(Some("s3cret"));
        assert_eq!(guard.authorize(Some("s3cret")), Access::Allow);
        assert_eq!(guard.authorize(Some("s3cret ")), Access::Deny);
        assert_eq!(guard.authorize(Some("")), Access::Deny);
        assert_eq!(guard.authorize(None), Access::Deny);
    }

    #[tokio::test]
    async fn access_layer_rejects_without_header() {
        let resp = test_router(Some("t"))
            .oneshot(Request::get("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "invalid admin token");
    }

    #[tokio::test]
    async fn access_layer_rejects_wrong_secret() {
        let req = Request::get("/private")
            .header(ADMIN_HEADER, "wrong")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(test_router(Some("t")), req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn access_layer_allows_matching_secret() {
        let req = Request::get("/private")
            .header(ADMIN_HEADER, "t")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(test_router(Some("t")), req).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn access_layer_open_without_secret() {
        let req = Request::get("/private").body(Body::empty()).unwrap();
        assert_eq!(status(test_router(None), req).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn access_layer_leaves_other_routes_alone() {
        let req = Request::get("/public").body(Body::empty()).unwrap();
        assert_eq!(status(test_router(Some("t")), req).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn api_key_layer_reads_its_own_header() {
        let app = Router::new()
            .route("/feed", get(|| async { "feed" }))
            .route_layer(AccessLayer::api_key(Some("k")));

        let with_admin_header = Request::get("/feed")
            .header(ADMIN_HEADER, "k")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            status(app.clone(), with_admin_header).await,
            StatusCode::UNAUTHORIZED
        );

        let with_key = Request::get("/feed")
            .header(API_KEY_HEADER, "k")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(app, with_key).await, StatusCode::OK);
    }
}
