//! Request correlation IDs.
//!
//! Every request gets an ID, either forwarded from an upstream proxy's
//! `x-request-id` header or freshly generated. The ID is stored in request
//! extensions as [`RequestId`], recorded on the request span created by
//! [`make_request_span`], tagged on the Sentry scope, and echoed back in the
//! response headers.

use axum::{
    body::Body,
    extract::Request,
    http::{self, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upstream IDs longer than this are replaced rather than trusted.
const MAX_FORWARDED_ID_LEN: usize = 128;

/// The correlation ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse a sane forwarded ID, otherwise generate a UUID v4.
    fn from_headers(headers: &http::HeaderMap) -> Self {
        let forwarded = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_FORWARDED_ID_LEN
                    && id
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
            });

        Self(forwarded.map_or_else(|| Uuid::new_v4().to_string(), String::from))
    }
}

/// Span for `TraceLayer` with an empty `request_id` field for the
/// middleware to fill in.
pub fn make_request_span(request: &http::Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
    )
}

/// Middleware that ensures every request has a [`RequestId`].
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers());

    Span::current().record("request_id", request_id.0.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id.0);
    });

    let header = HeaderValue::from_str(&request_id.0).ok();
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::{Extension, Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(RequestId(id)): Extension<RequestId>| async move { id }),
            )
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let response = app()
            .oneshot(http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_forwards_upstream_id() {
        let response = app()
            .oneshot(
                http::Request::get("/")
                    .header(REQUEST_ID_HEADER, "edge-42.a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "edge-42.a");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"edge-42.a");
    }

    #[tokio::test]
    async fn test_replaces_suspicious_upstream_id() {
        let response = app()
            .oneshot(
                http::Request::get("/")
                    .header(REQUEST_ID_HEADER, "x\" onload=alert(1)")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
    }
}
