//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the web
//! toolkit. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct WebConfig {
    /// Listener and development-mode settings.
    pub server: ServerConfig,

    /// Middleware ordering and forwarding limits.
    pub dispatcher: DispatcherConfig,

    /// Context store sweeping.
    pub context: ContextConfig,

    /// View names used by the dispatcher.
    pub renderer: RendererConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host, empty for all interfaces.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Development mode: panic details are shown in error responses.
    pub devel: bool,
}

impl ServerConfig {
    /// Socket address string to bind, e.g. "0.0.0.0:8080".
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() { "0.0.0.0" } else { self.host.as_str() };
        format!("{}:{}", host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 8080,
            devel: false,
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Declared middleware order, outermost first.
    pub middleware: Vec<String>,

    /// Maximum forwards a single request may follow.
    pub max_forwards: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            middleware: vec!["Error".to_string(), "Context".to_string()],
            max_forwards: 10,
        }
    }
}

/// Context store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Run the periodic sweep of abandoned request bags.
    pub sweep_enabled: bool,

    /// Seconds between sweeps.
    pub cleanup_interval_secs: u64,

    /// Bags older than this many seconds are swept.
    pub cleanup_max_age_secs: u64,
}

impl ContextConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: true,
            cleanup_interval_secs: 60,
            cleanup_max_age_secs: 300,
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// Template rendered for unmatched requests.
    pub not_found_template: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            not_found_template: "404.tmpl".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
