//! Route registration errors.
//!
//! All of these are raised while the route table is being built. They point
//! at programming mistakes in the route set and are never data dependent, so
//! hosts normally abort start-up when they see one.

use thiserror::Error;

use crate::routing::method::Method;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("cannot add a route with an empty pattern")]
    EmptyPattern,

    #[error("route '{pattern}' does not answer any method")]
    NoMethods { pattern: String },

    #[error("malformed route pattern '{pattern}': {reason}")]
    MalformedPattern { pattern: String, reason: String },

    #[error("found a duplicate param '{param}' along the route '{pattern}'")]
    DuplicateParam { pattern: String, param: String },

    #[error("route '{pattern}' conflicts with a parameter '{existing}' in the same position")]
    ConflictingParam { pattern: String, existing: String },

    #[error("a route for the same pattern '{pattern}' and method '{method}' already exists")]
    DuplicateRoute { pattern: String, method: Method },

    #[error("cannot add route '{pattern}', another with the name '{name}' is already added for '{method}'")]
    DuplicateName {
        pattern: String,
        name: String,
        method: Method,
    },
}
