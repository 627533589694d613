//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Own one dispatcher builder per mount pattern
//! - Create the Axum Router mounting every dispatcher
//! - Wire up middleware (tracing, timeout, request ID)
//! - Start context sweepers and serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::WebConfig;
use crate::context::ContextSweeper;
use crate::dispatch::{DispatchError, Dispatcher, DispatcherBuilder};
use crate::http::request::RequestIdLayer;
use crate::lifecycle::Shutdown;

/// HTTP server hosting one or more dispatchers.
pub struct Server {
    config: Arc<WebConfig>,
    builders: Vec<DispatcherBuilder>,
}

impl Server {
    pub fn new(config: WebConfig) -> Self {
        Self {
            config: Arc::new(config),
            builders: Vec::new(),
        }
    }

    pub fn config(&self) -> &Arc<WebConfig> {
        &self.config
    }

    /// Builder of the dispatcher mounted at `pattern`, created on first use.
    pub fn dispatcher(&mut self, pattern: &str) -> Result<&mut DispatcherBuilder, DispatchError> {
        let index = match self.builders.iter().position(|b| b.pattern() == pattern) {
            Some(index) => index,
            None => {
                self.builders
                    .push(DispatcherBuilder::new(pattern, self.config.clone())?);
                self.builders.len() - 1
            }
        };
        Ok(&mut self.builders[index])
    }

    /// Initialize every dispatcher and mount them on one router.
    pub fn into_router(self) -> Router {
        self.build().0
    }

    fn build(self) -> (Router, Vec<Dispatcher>) {
        let dispatchers: Vec<Dispatcher> = self
            .builders
            .into_iter()
            .map(DispatcherBuilder::initialize)
            .collect();

        let mut router = Router::new();
        for dispatcher in &dispatchers {
            let mount = dispatcher.pattern();
            router = router
                .route_service(mount, dispatcher.clone())
                .route_service(&format!("{mount}{{*rest}}"), dispatcher.clone());
        }

        let router = router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(self.config.timeouts.request_secs),
            ))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http());

        (router, dispatchers)
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let context_config = self.config.context.clone();
        let (router, dispatchers) = self.build();

        if context_config.sweep_enabled {
            for dispatcher in &dispatchers {
                let sweeper = ContextSweeper::from_config(dispatcher.context().clone(), &context_config);
                tokio::spawn(sweeper.run(shutdown.subscribe()));
            }
        }

        tracing::info!(
            address = %addr,
            dispatchers = dispatchers.len(),
            "HTTP server starting"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Handler;
    use crate::routing::{Method, Route};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_dispatcher_get_or_create() {
        let mut server = Server::new(WebConfig::default());
        server.dispatcher("/").unwrap();
        server.dispatcher("/api/").unwrap();
        server.dispatcher("/").unwrap();
        assert_eq!(server.builders.len(), 2);
        assert!(server.dispatcher("/bad").is_err());
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let mut config = WebConfig::default();
        config.timeouts.request_secs = 1;
        let mut server = Server::new(config);
        server
            .dispatcher("/")
            .unwrap()
            .handle(Route::new(
                "/slow",
                Method::GET,
                Handler::new(|_req| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            ))
            .unwrap();

        let req = Request::builder().uri("/slow").body(Body::empty()).unwrap();
        let res = server.into_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
