//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (build phase):
//!     Route { pattern, method, handler, name }
//!     → pattern.rs (canonicalise, tokenise)
//!     → trie.rs (one node per character, wildcard nodes for :name / *name)
//!     → named index (method → name → node)
//!
//! Incoming request path:
//!     → trie.rs lookup (literal edges first, then wildcard)
//!     → Match { routes per method, params } or miss
//!
//! Reverse lookup:
//!     name + method + params → trie.rs lookup_named → concrete path
//! ```
//!
//! # Design Decisions
//! - Trie is built once and immutable afterwards (lock-free reads)
//! - Registration problems are returned as `RouteError`, never panics
//! - Lookup cost depends on path length, not on the number of routes

pub mod error;
pub mod method;
pub(crate) mod pattern;
pub mod route;
pub mod trie;

pub use error::RouteError;
pub use method::Method;
pub use route::{Match, NamedMatch, Route, RouteParams};
pub use trie::Trie;
