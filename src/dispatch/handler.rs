//! Request handlers and the middleware contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

use crate::context::Context;

/// Future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, Response>;

/// Type-erased async request handler. Cloning shares the underlying closure.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(Request<Body>) -> HandlerFuture + Send + Sync>);

impl Handler {
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |request| {
            let future = f(request);
            Box::pin(async move { future.await.into_response() })
        }))
    }

    pub fn call(&self, request: Request<Body>) -> HandlerFuture {
        (self.0)(request)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// A stage of the dispatcher's chain.
///
/// `wrap` is called once, at initialisation, with the next stage inward. The
/// returned handler runs for every request. Panics raised further in are not
/// caught here unless the implementation does so itself.
pub trait Middleware: Send + Sync + 'static {
    /// Name used to place the middleware in the configured order. Defaults to
    /// the bare type name.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    fn wrap(&self, next: Handler, context: Arc<Context>) -> Handler;
}

/// `my_app::mw::Timing<u8>` becomes `Timing`.
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    struct Passthrough;

    impl Middleware for Passthrough {
        fn wrap(&self, next: Handler, _context: Arc<Context>) -> Handler {
            next
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Timing"), "Timing");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_default_middleware_name() {
        assert_eq!(Passthrough.name(), "Passthrough");
        let boxed: Arc<dyn Middleware> = Arc::new(Passthrough);
        assert_eq!(boxed.name(), "Passthrough");
    }

    #[tokio::test]
    async fn test_handler_into_response() {
        let h = Handler::new(|_req| async { (StatusCode::CREATED, "made") });
        let res = h.call(Request::new(Body::empty())).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}
