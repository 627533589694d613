//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Build phase (single owner):
//!     DispatcherBuilder
//!         ← handle / handle_controller / handle_multi_pattern (routes → trie)
//!         ← register_middleware
//!     → initialize()
//!         → chain.rs merge_middleware_order(declared, registered)
//!         → chain.rs wrap_chain(terminal, stages)
//!
//! Serve phase (shared, immutable):
//!     Dispatcher (tower::Service)
//!         → chain → terminal handler → route handler
//!         ↺ forward / named-forward
//! ```

pub mod chain;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod scope;

pub use chain::{merge_middleware_order, wrap_chain};
pub use controller::{Controller, MethodIdentifier, MultiPatternController, PatternController};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherHandle};
pub use error::DispatchError;
pub use handler::{Handler, HandlerFuture, Middleware};
pub use scope::{Scope, ScopeExt};
