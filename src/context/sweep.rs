//! Periodic sweep of abandoned request bags.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::ContextConfig;
use crate::context::store::Context;
use crate::observability::metrics;

/// Background task removing bags older than `max_age` every `interval`.
pub struct ContextSweeper {
    context: Arc<Context>,
    interval: Duration,
    max_age: Duration,
}

impl ContextSweeper {
    pub fn new(context: Arc<Context>, interval: Duration, max_age: Duration) -> Self {
        Self {
            context,
            interval,
            max_age,
        }
    }

    pub fn from_config(context: Arc<Context>, config: &ContextConfig) -> Self {
        Self::new(context, config.cleanup_interval(), config.cleanup_max_age())
    }

    /// Run one sweep, returning the number of bags removed.
    pub fn sweep(&self) -> usize {
        let removed = self.context.cleanup(self.max_age);
        let remaining = self.context.len();
        metrics::record_sweep(removed, remaining);
        if removed > 0 {
            tracing::debug!(removed, remaining, "Swept stale context entries");
        }
        removed
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::warn!("Context sweep interval is zero, sweeper not started");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "Context sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Context sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
