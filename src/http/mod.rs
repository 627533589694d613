//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one route pair per mounted dispatcher)
//!     → request.rs (add request ID)
//!     → Dispatcher (middleware chain, route lookup)
//!     → middleware/ (built-in Error and Context stages)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::Server;
