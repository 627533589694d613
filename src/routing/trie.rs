//! Character-level route trie.
//!
//! # Responsibilities
//! - Store routes in a prefix tree, one edge per character
//! - Extract `:name` parameters and `*name` globs during lookup
//! - Index named routes per method for reverse lookup
//!
//! # Design Decisions
//! - Nodes live in an arena and refer to each other by index
//! - Each node has at most one wildcard (param or glob) child; every pattern
//!   that reaches that position must agree on its kind and name
//! - Literal edges are tried before the wildcard child; a dead end falls back
//!   to the wildcard of the deepest branching node
//! - Built once, then only read (no interior mutability)

use std::collections::{BTreeMap, HashMap};

use crate::routing::error::RouteError;
use crate::routing::method::Method;
use crate::routing::pattern::{self, split_segment, Token};
use crate::routing::route::{Match, NamedMatch, Route, RouteParams};

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Normal,
    Param(String),
    Glob(String),
}

impl NodeKind {
    fn describe(&self) -> String {
        match self {
            NodeKind::Normal => String::new(),
            NodeKind::Param(name) => format!(":{}", name),
            NodeKind::Glob(name) => format!("*{}", name),
        }
    }
}

fn wildcard_kind(token: Token<'_>) -> NodeKind {
    match token {
        Token::Glob(name) => NodeKind::Glob(name.to_string()),
        Token::Param(name) => NodeKind::Param(name.to_string()),
        Token::Literal(_) => NodeKind::Normal,
    }
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    children: HashMap<char, NodeId>,
    wildcard: Option<NodeId>,
    routes: BTreeMap<Method, Route>,
    /// Canonical pattern of the routes ending here.
    pattern: Option<String>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: HashMap::new(),
            wildcard: None,
            routes: BTreeMap::new(),
            pattern: None,
        }
    }

    fn answers(&self, method: Method) -> bool {
        self.routes.keys().any(|m| m.intersects(method))
    }
}

/// Prefix tree of routes.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<Node>,
    named: HashMap<Method, HashMap<String, NodeId>>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Normal)],
            named: HashMap::new(),
        }
    }

    /// Number of registered (pattern, method) pairs.
    pub fn len(&self) -> usize {
        self.nodes.iter().map(|n| n.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a route.
    ///
    /// Fails on duplicate names, malformed patterns, conflicting wildcards and
    /// duplicate (pattern, method) pairs. Every check runs before the tree is
    /// touched, so a failed call leaves the trie unchanged.
    pub fn add_route(&mut self, route: Route) -> Result<(), RouteError> {
        if route.pattern.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        if route.method.is_empty() {
            return Err(RouteError::NoMethods {
                pattern: route.pattern.clone(),
            });
        }

        if !route.name.is_empty() {
            for method in route.method.iter() {
                let taken = self
                    .named
                    .get(&method)
                    .is_some_and(|names| names.contains_key(&route.name));
                if taken {
                    return Err(RouteError::DuplicateName {
                        pattern: route.pattern.clone(),
                        name: route.name.clone(),
                        method,
                    });
                }
            }
        }

        let canonical = pattern::canonicalize(&route.pattern)?;
        if let Some(existing) = self.resolve_path(&canonical, &route.pattern)? {
            for method in route.method.iter() {
                if self.nodes[existing].routes.contains_key(&method) {
                    return Err(RouteError::DuplicateRoute {
                        pattern: route.pattern.clone(),
                        method,
                    });
                }
            }
        }

        let node = self.insert_path(&canonical);
        for method in route.method.iter() {
            if !route.name.is_empty() {
                self.named
                    .entry(method)
                    .or_default()
                    .insert(route.name.clone(), node);
            }
            self.nodes[node].routes.insert(method, route.clone());
        }
        self.nodes[node].pattern = Some(canonical);

        tracing::trace!(
            pattern = %route.pattern,
            method = %route.method,
            name = %route.name,
            "Route added"
        );
        Ok(())
    }

    /// Check a canonical pattern against the tree without changing it.
    ///
    /// Returns the node the pattern ends at if every step already exists.
    fn resolve_path(&self, canonical: &str, original: &str) -> Result<Option<NodeId>, RouteError> {
        let mut current = Some(ROOT);
        let mut seen: Vec<&str> = Vec::new();

        for token in pattern::tokens(canonical) {
            current = match token {
                Token::Literal(c) => current.and_then(|n| self.nodes[n].children.get(&c).copied()),
                Token::Param(name) | Token::Glob(name) => {
                    if name.is_empty() {
                        return Err(RouteError::MalformedPattern {
                            pattern: original.to_string(),
                            reason: "parameter without a name".to_string(),
                        });
                    }
                    if seen.contains(&name) {
                        return Err(RouteError::DuplicateParam {
                            pattern: original.to_string(),
                            param: name.to_string(),
                        });
                    }
                    seen.push(name);

                    match current.and_then(|n| self.nodes[n].wildcard) {
                        Some(existing) if self.nodes[existing].kind != wildcard_kind(token) => {
                            return Err(RouteError::ConflictingParam {
                                pattern: original.to_string(),
                                existing: self.nodes[existing].kind.describe(),
                            });
                        }
                        found => found,
                    }
                }
            };
        }
        Ok(current)
    }

    /// Create the missing nodes of an already validated pattern.
    fn insert_path(&mut self, canonical: &str) -> NodeId {
        let mut current = ROOT;
        for token in pattern::tokens(canonical) {
            current = match token {
                Token::Literal(c) => self.literal_child(current, c),
                Token::Param(_) | Token::Glob(_) => self.wildcard_child(current, wildcard_kind(token)),
            };
        }
        current
    }

    fn literal_child(&mut self, parent: NodeId, c: char) -> NodeId {
        if let Some(&child) = self.nodes[parent].children.get(&c) {
            return child;
        }
        let child = self.push_node(NodeKind::Normal);
        self.nodes[parent].children.insert(c, child);
        child
    }

    fn wildcard_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        if let Some(existing) = self.nodes[parent].wildcard {
            return existing;
        }
        let child = self.push_node(kind);
        self.nodes[parent].wildcard = Some(child);
        child
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        self.nodes.len() - 1
    }

    /// Find the routes answering `method` for a concrete request path.
    pub fn lookup(&self, path: &str, method: Method) -> Option<Match> {
        let mut captured: Vec<(String, String)> = Vec::new();
        let node = self.walk(path, method, &mut captured)?;

        let routes: BTreeMap<Method, Route> = self.nodes[node]
            .routes
            .iter()
            .filter(|(m, _)| m.intersects(method))
            .map(|(m, r)| (*m, r.clone()))
            .collect();

        Some(Match {
            routes,
            params: captured.into_iter().collect(),
        })
    }

    /// Walk the path, backtracking into wildcard alternatives on dead ends.
    fn walk(&self, path: &str, method: Method, captured: &mut Vec<(String, String)>) -> Option<NodeId> {
        // (wildcard node, remaining path at the branch, captured length)
        let mut alternatives: Vec<(NodeId, &str, usize)> = Vec::new();
        let mut current = ROOT;
        let mut rest = path;

        loop {
            let node = &self.nodes[current];
            let mut advanced = false;

            if rest.is_empty() {
                if node.answers(method) {
                    return Some(current);
                }
            } else if let Some(head) = rest.chars().next() {
                if let Some(&child) = node.children.get(&head) {
                    if let Some(wildcard) = node.wildcard {
                        alternatives.push((wildcard, rest, captured.len()));
                    }
                    current = child;
                    rest = &rest[head.len_utf8()..];
                    advanced = true;
                } else if let Some(wildcard) = node.wildcard {
                    rest = self.capture(wildcard, rest, captured);
                    current = wildcard;
                    advanced = true;
                }
            }

            if !advanced {
                let (wildcard, at, mark) = alternatives.pop()?;
                captured.truncate(mark);
                rest = self.capture(wildcard, at, captured);
                current = wildcard;
            }
        }
    }

    /// Bind the wildcard's value and return what is left of the path.
    fn capture<'p>(&self, wildcard: NodeId, rest: &'p str, captured: &mut Vec<(String, String)>) -> &'p str {
        match &self.nodes[wildcard].kind {
            NodeKind::Param(name) => {
                let (value, remainder) = split_segment(rest);
                captured.push((name.clone(), value.to_string()));
                remainder
            }
            NodeKind::Glob(name) => {
                captured.push((name.clone(), rest.to_string()));
                ""
            }
            NodeKind::Normal => rest,
        }
    }

    /// Reverse lookup by name.
    ///
    /// Each matching verb gets its path rebuilt from the registered pattern,
    /// with parameter tokens replaced by values from `params`.
    pub fn lookup_named(&self, name: &str, method: Method, params: Option<&RouteParams>) -> Option<NamedMatch> {
        let mut routes = BTreeMap::new();
        let mut paths = BTreeMap::new();

        for m in method.iter() {
            let Some(&node) = self.named.get(&m).and_then(|names| names.get(name)) else {
                continue;
            };
            let node = &self.nodes[node];
            let Some(route) = node.routes.get(&m) else {
                continue;
            };
            let canonical = node.pattern.as_deref().unwrap_or(&route.pattern);
            paths.insert(m, pattern::reverse(canonical, params));
            routes.insert(m, route.clone());
        }

        if routes.is_empty() {
            None
        } else {
            Some(NamedMatch { routes, paths })
        }
    }
}
