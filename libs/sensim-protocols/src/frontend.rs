//! Periodic front-end driver
//!
//! Every front-end runs in its own task with its own counters. A failed tick
//! is logged and counted; the next tick starts fresh.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sensim_model::DEFAULT_TICK;

use crate::error::FrontendError;

#[async_trait]
pub trait Frontend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Push current state into the port; returns the number of items handled
    async fn tick(&self) -> Result<usize, FrontendError>;
}

#[derive(Debug, Default)]
pub struct FrontendStats {
    ticks: AtomicU64,
    errors: AtomicU64,
}

impl FrontendStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn record(&self, ok: bool) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Tick `frontend` every `period` until `token` is cancelled
pub async fn run_frontend(
    frontend: Arc<dyn Frontend>,
    period: Duration,
    stats: Arc<FrontendStats>,
    token: CancellationToken,
) {
    let period = if period.is_zero() { DEFAULT_TICK } else { period };
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("{} front-end started, period {:?}", frontend.name(), period);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                match frontend.tick().await {
                    Ok(count) => {
                        stats.record(true);
                        debug!("{} tick: {} items", frontend.name(), count);
                    },
                    Err(e) => {
                        stats.record(false);
                        warn!("{} tick failed: {}", frontend.name(), e);
                    },
                }
            }
        }
    }

    info!(
        "{} front-end stopped after {} ticks ({} errors)",
        frontend.name(),
        stats.ticks(),
        stats.errors()
    );
}
