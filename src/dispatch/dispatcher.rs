//! Request dispatcher.
//!
//! # Responsibilities
//! - Collect routes, controllers and middleware while building
//! - Merge declared and registered middleware into one chain
//! - Resolve each request against the trie and run the matched handler
//! - Follow internal forwards set by handlers, up to a limit
//!
//! # Data Flow
//! ```text
//! Request
//!     → Dispatcher::dispatch (request ID, Scope extension)
//!     → middleware chain (outermost first)
//!     → terminal handler
//!           ┌───────────────────────────────────────────────┐
//!           │ named-forward? → lookup_named                 │
//!           │ else forward or request path → strip mount    │
//!           │      → lookup                                 │
//!           │ hit  → store params/name/identifier → handler │
//!           │        → forward set? loop                    │
//!           │ miss → 404 view                               │
//!           └───────────────────────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Two types: `DispatcherBuilder` is mutable and single-owner, `Dispatcher`
//!   is immutable and cheap to clone
//! - The terminal handler holds a weak reference to the dispatcher, so the
//!   chain stored inside it does not keep it alive
//! - Forwarded invocations see the original request head and an empty body

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Weak};
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::Service;
use tracing::Instrument;

use crate::config::WebConfig;
use crate::context::keys::{
    CONFIG, CONTROLLER, DISPATCHER, FORWARD, LOGGER, MULTI_PATTERN_IDENTIFIER, NAMED_FORWARD, PARAMS, RENDERER,
    REQUEST, ROUTE_NAME,
};
use crate::context::Context;
use crate::dispatch::chain::{merge_middleware_order, wrap_chain};
use crate::dispatch::controller::{Controller, MultiPatternController, PatternController};
use crate::dispatch::error::DispatchError;
use crate::dispatch::handler::{Handler, Middleware};
use crate::dispatch::scope::Scope;
use crate::http::middleware::{ContextMiddleware, ErrorMiddleware};
use crate::http::request::{RequestId, RequestIdExt};
use crate::observability::metrics;
use crate::render::{PlainRenderer, RenderData, Renderer};
use crate::routing::{Method, Route, RouteParams, Trie};

/// Build phase of a dispatcher.
pub struct DispatcherBuilder {
    pattern: String,
    config: Arc<WebConfig>,
    context: Arc<Context>,
    renderer: Arc<dyn Renderer>,
    trie: Trie,
    middleware: HashMap<String, Arc<dyn Middleware>>,
    registered: Vec<String>,
    controllers: Vec<Arc<dyn Controller>>,
}

impl DispatcherBuilder {
    /// Create a builder mounted at `pattern`, which must end with '/'.
    pub fn new(pattern: impl Into<String>, config: Arc<WebConfig>) -> Result<Self, DispatchError> {
        let pattern = pattern.into();
        if !pattern.ends_with('/') {
            return Err(DispatchError::InvalidMountPattern(pattern));
        }

        Ok(Self {
            pattern,
            config,
            context: Arc::new(Context::new()),
            renderer: Arc::new(PlainRenderer::default()),
            trie: Trie::new(),
            middleware: HashMap::new(),
            registered: Vec::new(),
            controllers: Vec::new(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn config(&self) -> &Arc<WebConfig> {
        &self.config
    }

    /// Context store shared by this dispatcher's handlers.
    pub fn context(&self) -> Arc<Context> {
        self.context.clone()
    }

    pub fn set_renderer(&mut self, renderer: Arc<dyn Renderer>) -> &mut Self {
        self.renderer = renderer;
        self
    }

    /// Register a middleware under its name.
    ///
    /// Registering a second middleware with the same name replaces the first
    /// and keeps the original registration position.
    pub fn register_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        let name = middleware.name();
        if self.middleware.insert(name.clone(), Arc::new(middleware)).is_some() {
            tracing::debug!(mount = %self.pattern, middleware = %name, "Middleware replaced");
        } else {
            self.registered.push(name);
        }
        self
    }

    pub fn handle(&mut self, route: Route) -> Result<(), DispatchError> {
        self.trie.add_route(route)?;
        Ok(())
    }

    pub fn handle_controller<C: PatternController>(&mut self, controller: C) -> Result<(), DispatchError> {
        let controller = Arc::new(controller);
        let route = Route::new(
            controller.pattern(),
            controller.method(),
            controller.handler(self.context.clone()),
        )
        .with_name(controller.name())
        .with_owner(controller.clone());

        self.trie.add_route(route)?;
        self.controllers.push(controller);
        Ok(())
    }

    /// Register every pattern of a controller, all sharing one handler.
    pub fn handle_multi_pattern<C: MultiPatternController>(&mut self, controller: C) -> Result<(), DispatchError> {
        let controller = Arc::new(controller);
        let handler = controller.handler(self.context.clone());

        for (pattern, tuple) in controller.patterns() {
            let route = Route::new(pattern, tuple.method, handler.clone())
                .with_owner(controller.clone())
                .with_identifier(tuple.identifier);
            self.trie.add_route(route)?;
        }

        self.controllers.push(controller);
        Ok(())
    }

    /// Finish the build phase.
    pub fn initialize(self) -> Dispatcher {
        let DispatcherBuilder {
            pattern,
            config,
            context,
            renderer,
            trie,
            middleware,
            registered,
            controllers,
        } = self;

        context.set_global(RENDERER, renderer.clone());
        context.set_global(LOGGER, tracing::dispatcher::get_default(Clone::clone));
        context.set_global(CONFIG, config.clone());

        let mut order = Vec::new();
        let mut stages: Vec<Arc<dyn Middleware>> = Vec::new();
        for name in merge_middleware_order(&config.dispatcher.middleware, &registered) {
            match middleware.get(&name).cloned().or_else(|| builtin(&name, &config)) {
                Some(stage) => {
                    stages.push(stage);
                    order.push(name);
                }
                None => tracing::warn!(mount = %pattern, middleware = %name, "Unknown middleware, skipping"),
            }
        }

        tracing::info!(
            mount = %pattern,
            routes = trie.len(),
            middleware = ?order,
            "Dispatcher initialized"
        );

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            context.set_global(DISPATCHER, DispatcherHandle(weak.clone()));
            let chain = wrap_chain(terminal_handler(weak.clone()), &stages, &context);

            Inner {
                pattern,
                config,
                context: context.clone(),
                renderer,
                trie,
                chain,
                order,
                controllers,
            }
        });

        Dispatcher { inner }
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("pattern", &self.pattern)
            .field("routes", &self.trie.len())
            .field("middleware", &self.registered)
            .finish_non_exhaustive()
    }
}

fn builtin(name: &str, config: &WebConfig) -> Option<Arc<dyn Middleware>> {
    match name {
        "Context" => Some(Arc::new(ContextMiddleware)),
        "Error" => Some(Arc::new(ErrorMiddleware::new(config.server.devel))),
        _ => None,
    }
}

fn terminal_handler(dispatcher: Weak<Inner>) -> Handler {
    Handler::new(move |request| {
        let inner = dispatcher.upgrade();
        async move {
            match inner {
                Some(inner) => inner.run(request).await,
                None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            }
        }
    })
}

struct Inner {
    pattern: String,
    config: Arc<WebConfig>,
    context: Arc<Context>,
    renderer: Arc<dyn Renderer>,
    trie: Trie,
    chain: Handler,
    order: Vec<String>,
    controllers: Vec<Arc<dyn Controller>>,
}

impl Inner {
    /// Mount pattern without its trailing '/'.
    fn prefix(&self) -> &str {
        self.pattern.strip_suffix('/').unwrap_or(&self.pattern)
    }

    async fn run(self: Arc<Self>, mut request: Request<Body>) -> Response {
        let id = request.ensure_request_id();
        let method = Method::from(request.method());
        let (parts, body) = request.into_parts();
        let mut body = Some(body);
        let limit = self.config.dispatcher.max_forwards;
        let mut forwards = 0usize;

        self.context.set(id, REQUEST, Arc::new(parts.clone()));

        loop {
            let Some((route, params)) = self.resolve(id, &parts, method) else {
                return self.not_found(id, &parts);
            };
            self.bind(id, &route, params);

            tracing::debug!(
                request_id = %id,
                route = %route.pattern,
                forwards,
                "Route matched"
            );

            let request = Request::from_parts(parts.clone(), body.take().unwrap_or_else(Body::empty));
            let response = route.handler.call(request).await;

            if !self.forward_pending(id) {
                return response;
            }

            forwards += 1;
            metrics::record_forward(&self.pattern);
            if forwards > limit {
                self.context.delete(id, FORWARD);
                self.context.delete(id, NAMED_FORWARD);
                tracing::warn!(request_id = %id, limit, "Forward limit exceeded");
                return DispatchError::ForwardLimitExceeded { limit }.into_response();
            }
        }
    }

    /// Pick the route for the current target of a request.
    ///
    /// Params are `None` for named forwards, which leave the stored ones in place.
    fn resolve(&self, id: RequestId, parts: &Parts, method: Method) -> Option<(Route, Option<RouteParams>)> {
        if let Some(name) = self.context.take(id, NAMED_FORWARD).filter(|n| !n.is_empty()) {
            let found = self.trie.lookup_named(&name, method, None);
            if found.is_none() {
                tracing::debug!(request_id = %id, name = %name, "Named forward target not found");
            }
            let route = found?.first_route()?.clone();
            return Some((route, None));
        }

        let target = match self.context.take(id, FORWARD).filter(|p| !p.is_empty()) {
            Some(forward) => match forward.split_once('?') {
                Some((path, _)) => path.to_string(),
                None => forward,
            },
            None => parts.uri.path().to_string(),
        };
        self.context.delete(id, PARAMS);

        let path = target.strip_prefix(self.prefix())?;
        let found = self.trie.lookup(path, method)?;
        let route = found.first_route()?.clone();
        Some((route, Some(found.into_params())))
    }

    /// Store what handlers need to know about the matched route.
    fn bind(&self, id: RequestId, route: &Route, params: Option<RouteParams>) {
        if let Some(params) = params {
            self.context.set(id, PARAMS, params);
        }

        if route.name.is_empty() {
            self.context.delete(id, ROUTE_NAME);
        } else {
            self.context.set(id, ROUTE_NAME, route.name.clone());
        }

        match &route.identifier {
            Some(identifier) => self.context.set(id, MULTI_PATTERN_IDENTIFIER, identifier.clone()),
            None => self.context.delete(id, MULTI_PATTERN_IDENTIFIER),
        }

        match &route.owner {
            Some(owner) => self.context.set(id, CONTROLLER, owner.clone()),
            None => self.context.delete(id, CONTROLLER),
        }
    }

    fn forward_pending(&self, id: RequestId) -> bool {
        let set = |value: Option<String>| value.is_some_and(|v| !v.is_empty());
        set(self.context.get(id, FORWARD)) || set(self.context.get(id, NAMED_FORWARD))
    }

    fn not_found(&self, id: RequestId, parts: &Parts) -> Response {
        metrics::record_not_found(&self.pattern);
        tracing::debug!(request_id = %id, path = %parts.uri.path(), "No route matched");

        let template = self.config.renderer.not_found_template.as_str();
        let bag = self.context.get_all(id);
        let body = match self.renderer.render(&[template], &RenderData::new(), bag.as_ref()) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(request_id = %id, error = %e, "Failed to render not-found view");
                StatusCode::NOT_FOUND.canonical_reason().unwrap_or_default().to_string()
            }
        };

        (StatusCode::NOT_FOUND, body).into_response()
    }
}

/// Serve phase of a dispatcher. Clones share the same routes and chain.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder(pattern: impl Into<String>, config: Arc<WebConfig>) -> Result<DispatcherBuilder, DispatchError> {
        DispatcherBuilder::new(pattern, config)
    }

    /// Mount pattern, always ending with '/'.
    pub fn pattern(&self) -> &str {
        &self.inner.pattern
    }

    pub fn config(&self) -> &Arc<WebConfig> {
        &self.inner.config
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.inner.context
    }

    /// Effective middleware order, outermost first.
    pub fn middleware_order(&self) -> &[String] {
        &self.inner.order
    }

    pub fn controllers(&self) -> &[Arc<dyn Controller>] {
        &self.inner.controllers
    }

    /// Path of the route named `name`, prefixed with the mount pattern.
    ///
    /// When several verbs match, the lowest one wins. Returns an empty string
    /// when no route carries the name.
    pub fn name_to_path(&self, name: &str, method: Method, params: Option<&RouteParams>) -> String {
        self.inner
            .trie
            .lookup_named(name, method, params)
            .and_then(|found| found.first_path().map(|path| format!("{}{}", self.inner.prefix(), path)))
            .unwrap_or_default()
    }

    /// Run a request through the middleware chain.
    pub async fn dispatch(&self, mut request: Request<Body>) -> Response {
        let id = request.ensure_request_id();
        request
            .extensions_mut()
            .insert(Scope::new(id, self.inner.context.clone()));

        let start = Instant::now();
        let method = request.method().clone();
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %id,
            method = %method,
            path = %request.uri().path(),
        );

        let response = self.inner.chain.call(request).instrument(span).await;
        metrics::record_request(&self.inner.pattern, method.as_str(), response.status().as_u16(), start);
        response
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pattern", &self.inner.pattern)
            .field("routes", &self.inner.trie.len())
            .field("middleware", &self.inner.order)
            .finish_non_exhaustive()
    }
}

impl Service<Request<Body>> for Dispatcher {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(request).await) })
    }
}

/// Weak reference to a dispatcher, kept in the global context bag.
#[derive(Clone)]
pub struct DispatcherHandle(Weak<Inner>);

impl DispatcherHandle {
    pub fn upgrade(&self) -> Option<Dispatcher> {
        self.0.upgrade().map(|inner| Dispatcher { inner })
    }
}

impl fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DispatcherHandle")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteError;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    fn config() -> Arc<WebConfig> {
        Arc::new(WebConfig::default())
    }

    fn text(body: &'static str) -> Handler {
        Handler::new(move |_req| async move { body })
    }

    async fn get(dispatcher: &Dispatcher, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = dispatcher.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_mount_pattern_must_end_with_slash() {
        assert!(matches!(
            DispatcherBuilder::new("/prefix", config()),
            Err(DispatchError::InvalidMountPattern(p)) if p == "/prefix"
        ));
        assert!(DispatcherBuilder::new("/prefix/", config()).is_ok());
    }

    #[test]
    fn test_duplicate_route_propagates() {
        let mut b = DispatcherBuilder::new("/", config()).unwrap();
        b.handle(Route::new("/a", Method::GET, text("a"))).unwrap();
        let err = b.handle(Route::new("/a", Method::GET, text("a"))).unwrap_err();
        assert!(matches!(err, DispatchError::Route(_)));
    }

    #[test]
    fn test_query_pattern_rejected() {
        let mut b = DispatcherBuilder::new("/", config()).unwrap();
        let route = Route::new("/search?q=:term", Method::GET, text("found"));
        let err = b.handle(route).unwrap_err();
        assert!(matches!(err, DispatchError::Route(RouteError::MalformedPattern { .. })));
    }

    #[tokio::test]
    async fn test_query_string_ignored_by_lookup() {
        let mut b = DispatcherBuilder::new("/", config()).unwrap();
        b.handle(Route::new("/search", Method::GET, text("found"))).unwrap();
        let d = b.initialize();
        assert_eq!(get(&d, "/search?q=rust").await, (StatusCode::OK, "found".to_string()));
    }

    #[test]
    fn test_name_to_path() {
        for (mount, expected) in [("/", "/test/stuff"), ("/prefix/", "/prefix/test/stuff")] {
            let mut b = DispatcherBuilder::new(mount, config()).unwrap();
            b.handle(Route::new("/test/:name", Method::GET, text("")).with_name("named1"))
                .unwrap();
            let d = b.initialize();

            let params: RouteParams = [("name", "stuff")].into_iter().collect();
            assert_eq!(d.name_to_path("named1", Method::ALL, Some(&params)), expected);
            assert_eq!(d.name_to_path("missing", Method::ALL, None), "");
        }
    }

    #[test]
    fn test_middleware_order_skips_unknown() {
        let mut c = WebConfig::default();
        c.dispatcher.middleware = vec!["Static".into(), "Error".into(), "Context".into()];
        let d = DispatcherBuilder::new("/", Arc::new(c)).unwrap().initialize();
        assert_eq!(d.middleware_order(), ["Error", "Context"]);
    }

    #[test]
    fn test_globals_after_initialize() {
        let d = DispatcherBuilder::new("/", config()).unwrap().initialize();
        let handle = d.context().get_global(DISPATCHER).unwrap();
        assert_eq!(handle.upgrade().unwrap().pattern(), "/");
        assert!(d.context().get_global(CONFIG).is_some());
        assert!(d.context().get_global(RENDERER).is_some());
    }

    #[tokio::test]
    async fn test_mount_prefix_is_stripped() {
        let mut b = DispatcherBuilder::new("/prefix/", config()).unwrap();
        b.handle(Route::new("/hello", Method::GET, text("hi"))).unwrap();
        let d = b.initialize();

        assert_eq!(get(&d, "/prefix/hello").await, (StatusCode::OK, "hi".to_string()));
        assert_eq!(get(&d, "/hello").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_uses_renderer() {
        let d = DispatcherBuilder::new("/", config()).unwrap().initialize();
        assert_eq!(get(&d, "/nothing").await, (StatusCode::NOT_FOUND, "Not Found".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_falls_back_on_render_error() {
        let mut b = DispatcherBuilder::new("/", config()).unwrap();
        b.set_renderer(Arc::new(PlainRenderer::empty()));
        let d = b.initialize();
        assert_eq!(get(&d, "/nothing").await, (StatusCode::NOT_FOUND, "Not Found".to_string()));
    }

    #[tokio::test]
    async fn test_forward_loop_is_capped() {
        let mut c = WebConfig::default();
        c.dispatcher.max_forwards = 3;
        let mut b = DispatcherBuilder::new("/", Arc::new(c)).unwrap();
        b.handle(Route::new(
            "/loop",
            Method::GET,
            Handler::new(|req: Request<Body>| async move {
                if let Some(scope) = req.extensions().get::<Scope>() {
                    scope.forward("/loop");
                }
                "again"
            }),
        ))
        .unwrap();
        let d = b.initialize();

        let (status, body) = get(&d, "/loop").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("forward limit of 3"));
        assert!(d.context().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_dispatcher_handle() {
        let d = DispatcherBuilder::new("/", config()).unwrap().initialize();
        let handle = d.context().get_global(DISPATCHER).unwrap();
        let context = d.context().clone();
        drop(d);
        assert!(handle.upgrade().is_none());
        assert!(context.get_global(DISPATCHER).is_some());
    }
}
