//! Controllers: route producers registered on a dispatcher.
//!
//! A controller hands out one handler, built once against the dispatcher's
//! context. Pattern controllers bind it to a single pattern; multi-pattern
//! controllers bind it to many, each tagged with an identifier that the
//! handler reads back through `Scope::multi_pattern_identifier`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::Context;
use crate::dispatch::handler::Handler;
use crate::routing::Method;

pub trait Controller: Send + Sync + 'static {
    fn handler(&self, context: Arc<Context>) -> Handler;
}

pub trait PatternController: Controller {
    /// Path template, may contain `:name` parameters and a trailing `*name` glob.
    fn pattern(&self) -> &str;

    fn method(&self) -> Method;

    /// Route name for reverse lookups, empty when unnamed.
    fn name(&self) -> &str {
        ""
    }
}

/// Verb set and identifier of one pattern of a [`MultiPatternController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodIdentifier {
    pub method: Method,
    pub identifier: String,
}

impl MethodIdentifier {
    pub fn new(method: Method, identifier: impl Into<String>) -> Self {
        Self {
            method,
            identifier: identifier.into(),
        }
    }
}

pub trait MultiPatternController: Controller {
    /// Pattern to verb/identifier map. Ordered so registration is deterministic.
    fn patterns(&self) -> BTreeMap<String, MethodIdentifier>;
}
