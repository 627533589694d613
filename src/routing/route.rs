//! Route table entries and lookup results.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::{Controller, Handler};
use crate::routing::method::Method;

/// A registered route. Immutable once added to the trie.
#[derive(Clone)]
pub struct Route {
    /// Path template, may contain `:name` and a trailing `*name`.
    pub pattern: String,

    /// Verbs the route answers.
    pub method: Method,

    /// Request handler.
    pub handler: Handler,

    /// Unique name per method, empty when unnamed.
    pub name: String,

    /// Controller that registered the route, for introspection.
    pub owner: Option<Arc<dyn Controller>>,

    /// Pattern identifier of a multi-pattern controller.
    pub identifier: Option<String>,
}

impl Route {
    pub fn new(pattern: impl Into<String>, method: Method, handler: Handler) -> Self {
        Self {
            pattern: pattern.into(),
            method,
            handler,
            name: String::new(),
            owner: None,
            identifier: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_owner(mut self, owner: Arc<dyn Controller>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("owner", &self.owner.is_some())
            .finish_non_exhaustive()
    }
}

/// Values captured by `:name` and `*name` tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Result of a path lookup.
#[derive(Debug, Clone)]
pub struct Match {
    pub(crate) routes: BTreeMap<Method, Route>,
    pub(crate) params: RouteParams,
}

impl Match {
    /// Routes at the matched node whose verb intersects the requested set.
    pub fn routes(&self) -> &BTreeMap<Method, Route> {
        &self.routes
    }

    /// Route registered for a single verb.
    pub fn route(&self, method: Method) -> Option<&Route> {
        self.routes.get(&method)
    }

    /// First route in verb order. Lookups never yield an empty match.
    pub fn first_route(&self) -> Option<&Route> {
        self.routes.values().next()
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn into_params(self) -> RouteParams {
        self.params
    }
}

/// Result of a reverse lookup by route name.
#[derive(Debug, Clone)]
pub struct NamedMatch {
    pub(crate) routes: BTreeMap<Method, Route>,
    pub(crate) paths: BTreeMap<Method, String>,
}

impl NamedMatch {
    pub fn routes(&self) -> &BTreeMap<Method, Route> {
        &self.routes
    }

    pub fn route(&self, method: Method) -> Option<&Route> {
        self.routes.get(&method)
    }

    pub fn first_route(&self) -> Option<&Route> {
        self.routes.values().next()
    }

    /// Reconstructed path per verb.
    pub fn paths(&self) -> &BTreeMap<Method, String> {
        &self.paths
    }

    /// Path of the lowest matching verb.
    pub fn first_path(&self) -> Option<&str> {
        self.paths.values().next().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_collect() {
        let params: RouteParams = [("name", "stuff"), ("id", "7")].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("name"), Some("stuff"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_params_serialize_as_map() {
        let mut params = RouteParams::new();
        params.insert("name", "World");
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"name":"World"}"#);
    }

    #[test]
    fn test_route_builder() {
        let route = Route::new("/a/:b", Method::GET, Handler::new(|_req| async { "ok" }))
            .with_name("a")
            .with_identifier("first");
        assert_eq!(route.name, "a");
        assert_eq!(route.identifier.as_deref(), Some("first"));
        assert!(route.owner.is_none());
        assert!(format!("{:?}", route).contains("/a/:b"));
    }
}
