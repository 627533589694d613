//! dispatchkit demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum Router ──▶ RequestIdLayer ──▶ Dispatcher("/")
//!                                                          │
//!                                   ┌──────────────────────┘
//!                                   ▼
//!                       Timing ─▶ Error ─▶ Context ─▶ terminal handler
//!                                                          │
//!                                          trie lookup ◀───┤◀── forward
//!                                                          ▼
//!     Client Response ◀────────────────────────────── route handler
//! ```
//!
//! Routes:
//! - `/` (named `home`) links to `hello` through reverse lookup
//! - `/hello/:name` (named `hello`) greets
//! - `/old/*path` forwards internally to `/hello/{path}`
//! - `/start` forwards by name to `home`
//! - `/about`, `/contact` share one multi-pattern controller

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use clap::Parser;
use tokio::net::TcpListener;

use dispatchkit::config::read_config;
use dispatchkit::dispatch::MethodIdentifier;
use dispatchkit::lifecycle::spawn_signal_handler;
use dispatchkit::observability::{init_logging, init_metrics};
use dispatchkit::{
    Context, Controller, Handler, Method, Middleware, MultiPatternController, PatternController, RouteParams,
    ScopeExt, Server, Shutdown,
};

#[derive(Parser)]
#[command(name = "dispatchkit")]
#[command(about = "Demo server for the dispatchkit router", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "dispatchkit.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(short, long)]
    port: Option<u16>,
}

/// Logs how long the inner chain took.
struct Timing;

impl Middleware for Timing {
    fn wrap(&self, next: Handler, _context: Arc<Context>) -> Handler {
        Handler::new(move |request: Request<Body>| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let path = request.uri().path().to_string();
                let response = next.call(request).await;
                tracing::info!(
                    path = %path,
                    status = response.status().as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request handled"
                );
                response
            }
        })
    }
}

struct Home;

impl Controller for Home {
    fn handler(&self, _context: Arc<Context>) -> Handler {
        Handler::new(|request: Request<Body>| async move {
            let Some(dispatcher) = request.scope().and_then(|s| s.dispatcher()) else {
                return "home".to_string();
            };
            let params: RouteParams = [("name", "world")].into_iter().collect();
            format!(
                "home\nhello: {}\n",
                dispatcher.name_to_path("hello", Method::GET, Some(&params)),
            )
        })
    }
}

impl PatternController for Home {
    fn pattern(&self) -> &str {
        "/"
    }

    fn method(&self) -> Method {
        Method::GET
    }

    fn name(&self) -> &str {
        "home"
    }
}

struct Hello;

impl Controller for Hello {
    fn handler(&self, _context: Arc<Context>) -> Handler {
        Handler::new(|request: Request<Body>| async move {
            let name = request
                .scope()
                .and_then(|s| s.param("name"))
                .unwrap_or_default();
            format!("Hello, {name}!")
        })
    }
}

impl PatternController for Hello {
    fn pattern(&self) -> &str {
        "/hello/:name"
    }

    fn method(&self) -> Method {
        Method::GET | Method::HEAD
    }

    fn name(&self) -> &str {
        "hello"
    }
}

/// Old URLs are forwarded to their new location without a redirect.
struct Legacy;

impl Controller for Legacy {
    fn handler(&self, _context: Arc<Context>) -> Handler {
        Handler::new(|request: Request<Body>| async move {
            if let Some(scope) = request.scope() {
                let path = scope.param("path").unwrap_or_default();
                scope.forward(format!("/hello/{path}"));
            }
        })
    }
}

impl PatternController for Legacy {
    fn pattern(&self) -> &str {
        "/old/*path"
    }

    fn method(&self) -> Method {
        Method::GET
    }
}

struct Start;

impl Controller for Start {
    fn handler(&self, _context: Arc<Context>) -> Handler {
        Handler::new(|request: Request<Body>| async move {
            if let Some(scope) = request.scope() {
                scope.named_forward("home");
            }
        })
    }
}

impl PatternController for Start {
    fn pattern(&self) -> &str {
        "/start"
    }

    fn method(&self) -> Method {
        Method::GET
    }
}

struct Pages;

impl Controller for Pages {
    fn handler(&self, _context: Arc<Context>) -> Handler {
        Handler::new(|request: Request<Body>| async move {
            match request.scope().and_then(|s| s.multi_pattern_identifier()).as_deref() {
                Some("about") => "About this demo",
                Some("contact") => "Contact: nobody",
                _ => "Unknown page",
            }
        })
    }
}

impl MultiPatternController for Pages {
    fn patterns(&self) -> BTreeMap<String, MethodIdentifier> {
        BTreeMap::from([
            ("/about".to_string(), MethodIdentifier::new(Method::GET, "about")),
            ("/contact".to_string(), MethodIdentifier::new(Method::GET, "contact")),
        ])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(&config.observability);
    tracing::info!("dispatchkit v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address(),
        middleware = ?config.dispatcher.middleware,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(config.server.bind_address()).await?;

    let mut server = Server::new(config);
    let root = server.dispatcher("/")?;
    root.register_middleware(Timing);
    root.handle_controller(Home)?;
    root.handle_controller(Hello)?;
    root.handle_controller(Legacy)?;
    root.handle_controller(Start)?;
    root.handle_multi_pattern(Pages)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
