//! Built-in middleware, resolvable by name from the configured order.
//!
//! - `Error`: panic recovery, 500 response
//! - `Context`: deletes the request's context bag after the chain

pub mod context;
pub mod error;

pub use context::ContextMiddleware;
pub use error::ErrorMiddleware;
