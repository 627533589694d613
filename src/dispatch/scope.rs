//! Typed accessors over one request's context bag.
//!
//! The dispatcher attaches a [`Scope`] to every request it serves. Handlers
//! and middleware reach the framework slots through it instead of naming
//! reserved keys directly.

use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::Request;

use crate::config::WebConfig;
use crate::context::keys::{
    self, Key, CONTROLLER, FORWARD, MULTI_PATTERN_IDENTIFIER, NAMED_FORWARD, PARAMS, REQUEST, ROUTE_NAME,
};
use crate::context::Context;
use crate::dispatch::controller::Controller;
use crate::dispatch::dispatcher::Dispatcher;
use crate::http::request::RequestId;
use crate::render::{PlainRenderer, RenderData, RenderError, Renderer};
use crate::routing::RouteParams;

/// A request's identity paired with the context store serving it.
#[derive(Clone, Debug)]
pub struct Scope {
    id: RequestId,
    context: Arc<Context>,
}

impl Scope {
    pub fn new(id: RequestId, context: Arc<Context>) -> Self {
        Self { id, context }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: Key<T>) -> Option<T> {
        self.context.get(self.id, key)
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: Key<T>, value: T) {
        self.context.set(self.id, key, value);
    }

    pub fn delete<T>(&self, key: Key<T>) {
        self.context.delete(self.id, key);
    }

    /// Parameters captured by the matched route. Empty when none were captured.
    pub fn params(&self) -> RouteParams {
        self.get(PARAMS).unwrap_or_default()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params().get(name).map(str::to_string)
    }

    pub fn route_name(&self) -> Option<String> {
        self.get(ROUTE_NAME)
    }

    pub fn multi_pattern_identifier(&self) -> Option<String> {
        self.get(MULTI_PATTERN_IDENTIFIER)
    }

    pub fn controller(&self) -> Option<Arc<dyn Controller>> {
        self.get(CONTROLLER)
    }

    /// Head of the request being dispatched.
    pub fn request(&self) -> Option<Arc<Parts>> {
        self.get(REQUEST)
    }

    /// Re-dispatch to `path` once the current handler returns.
    pub fn forward(&self, path: impl Into<String>) {
        self.set(FORWARD, path.into());
    }

    /// Re-dispatch to the route named `name` once the current handler returns.
    pub fn named_forward(&self, name: impl Into<String>) {
        self.set(NAMED_FORWARD, name.into());
    }

    pub fn config(&self) -> Arc<WebConfig> {
        self.context.get_global(keys::CONFIG).unwrap_or_default()
    }

    pub fn renderer(&self) -> Arc<dyn Renderer> {
        self.context
            .get_global(keys::RENDERER)
            .unwrap_or_else(|| Arc::new(PlainRenderer::default()))
    }

    pub fn logger(&self) -> tracing::Dispatch {
        self.context
            .get_global(keys::LOGGER)
            .unwrap_or_else(|| tracing::dispatcher::get_default(Clone::clone))
    }

    /// Dispatcher serving this request, while it is alive.
    pub fn dispatcher(&self) -> Option<Dispatcher> {
        self.context.get_global(keys::DISPATCHER)?.upgrade()
    }

    /// Render through the active renderer, with this request's bag as context.
    pub fn render(&self, names: &[&str], data: &RenderData) -> Result<String, RenderError> {
        let bag = self.context.get_all(self.id);
        self.renderer().render(names, data, bag.as_ref())
    }
}

/// Access to the [`Scope`] attached by the dispatcher.
pub trait ScopeExt {
    fn scope(&self) -> Option<Scope>;
}

impl<B> ScopeExt for Request<B> {
    fn scope(&self) -> Option<Scope> {
        self.extensions().get::<Scope>().cloned()
    }
}
