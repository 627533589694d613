//! Typed context keys.
//!
//! A key pairs a static name with the type of the value stored under it, so
//! reads never need a runtime cast at the call site. Names are the identity:
//! two keys with the same name address the same slot, and a read through a
//! key of the wrong type yields `None`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::http::request::Parts;

use crate::config::WebConfig;
use crate::dispatch::{Controller, DispatcherHandle};
use crate::render::Renderer;
use crate::routing::RouteParams;

/// Key of a context slot holding a `T`.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.name)
    }
}

/// Names owned by the framework. Application keys must avoid them.
pub const RESERVED: [&str; 15] = [
    "r",
    "params",
    "renderer",
    "logger",
    "dispatcher",
    "config",
    "session",
    "lang",
    "langs",
    "forward",
    "named-forward",
    "route-name",
    "controller",
    "multi-pattern-identifier",
    "firstTimer",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

// Per-request slots.

/// Head of the request currently being dispatched.
pub const REQUEST: Key<Arc<Parts>> = Key::new("r");
/// Parameters captured by the matched route.
pub const PARAMS: Key<RouteParams> = Key::new("params");
/// Path to re-dispatch to once the current handler returns.
pub const FORWARD: Key<String> = Key::new("forward");
/// Route name to re-dispatch to once the current handler returns.
pub const NAMED_FORWARD: Key<String> = Key::new("named-forward");
pub const ROUTE_NAME: Key<String> = Key::new("route-name");
pub const MULTI_PATTERN_IDENTIFIER: Key<String> = Key::new("multi-pattern-identifier");
pub const CONTROLLER: Key<Arc<dyn Controller>> = Key::new("controller");

// Global slots.

pub const RENDERER: Key<Arc<dyn Renderer>> = Key::new("renderer");
pub const LOGGER: Key<tracing::Dispatch> = Key::new("logger");
pub const DISPATCHER: Key<DispatcherHandle> = Key::new("dispatcher");
pub const CONFIG: Key<Arc<WebConfig>> = Key::new("config");
