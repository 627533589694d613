//! Request identity.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per inbound request
//! - Attach it as a request extension so the context store can key on it
//! - Echo it back in the `x-request-id` response header
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client supplied `x-request-id` headers are never trusted as bag keys
//! - An ID already present as an extension is kept, so nested services agree

use std::fmt;
use std::task::{Context, Poll};

use axum::http::{HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};
use uuid::Uuid;

/// Response header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Identity of one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Access to the request ID stored in a request's extensions.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<RequestId>;

    /// Return the existing ID, or generate and attach a new one.
    fn ensure_request_id(&mut self) -> RequestId;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().copied()
    }

    fn ensure_request_id(&mut self) -> RequestId {
        if let Some(id) = self.request_id() {
            return id;
        }
        let id = RequestId::new();
        self.extensions_mut().insert(id);
        id
    }
}

/// Layer that tags every request with a [`RequestId`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B, ResBody> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let id = request.ensure_request_id();
        let future = self.inner.call(request);

        Box::pin(async move {
            let mut response = future.await?;
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[test]
    fn test_ensure_is_stable() {
        let mut req = Request::new(Body::empty());
        assert!(req.request_id().is_none());
        let first = req.ensure_request_id();
        assert_eq!(req.ensure_request_id(), first);
        assert_eq!(req.request_id(), Some(first));
    }

    #[tokio::test]
    async fn test_layer_sets_header() {
        let svc = RequestIdLayer.layer(service_fn(|req: Request<Body>| async move {
            assert!(req.request_id().is_some());
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));

        let res = svc.oneshot(Request::new(Body::empty())).await.unwrap();
        let header = res.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
    }
}
