//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WebConfig (validated, immutable)
//!     → shared via Arc with every dispatcher and the global context bag
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; dispatchers are built against a snapshot
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::{
    ContextConfig, DispatcherConfig, ObservabilityConfig, RendererConfig, ServerConfig, TimeoutConfig, WebConfig,
};
pub use validation::{validate_config, ValidationError};
