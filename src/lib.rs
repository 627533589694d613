//! Pattern-matching request dispatch over a character-level route trie.
//!
//! A [`Server`] hosts dispatchers, each mounted at a pattern ending in '/'.
//! Every dispatcher owns a route [`Trie`], a middleware chain and a
//! per-request [`Context`] store.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::WebConfig;
pub use context::{Context, Key};
pub use dispatch::{
    Controller, DispatchError, Dispatcher, DispatcherBuilder, Handler, Middleware, MultiPatternController,
    PatternController, Scope, ScopeExt,
};
pub use http::Server;
pub use lifecycle::Shutdown;
pub use render::{PlainRenderer, Renderer};
pub use routing::{Method, Route, RouteError, RouteParams, Trie};
