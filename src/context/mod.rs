//! Request-scoped state.
//!
//! # Data Flow
//! ```text
//! Dispatcher (per request):
//!     → store.rs set(request_id, PARAMS / ROUTE_NAME / ...)
//!     → handlers and middleware read/write through typed keys (keys.rs)
//!     → "Context" middleware deletes the bag when the chain returns
//!
//! Background:
//!     sweep.rs → store.rs cleanup(max_age) every interval
//! ```
//!
//! # Design Decisions
//! - Keys carry their value type; a mismatched read is a miss, not a panic
//! - The global bag holds framework singletons (renderer, config, dispatcher)
//! - The sweeper is a safety net for chains without the "Context" middleware

pub mod keys;
pub mod store;
pub mod sweep;

pub use keys::Key;
pub use store::{Context, ContextData};
pub use sweep::ContextSweeper;
