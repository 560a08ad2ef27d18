//! Simulation clock
//!
//! The only task that advances simulated values. It calls
//! [`Registry::update_all`] once per period until cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::Registry;
use crate::time::TimeProvider;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

pub struct SimulationClock {
    registry: Arc<Registry>,
    time: Arc<dyn TimeProvider>,
    period: Duration,
    ticks: AtomicU64,
}

impl SimulationClock {
    pub fn new(registry: Arc<Registry>, time: Arc<dyn TimeProvider>, period: Duration) -> Self {
        let period = if period.is_zero() { DEFAULT_TICK } else { period };
        Self {
            registry,
            time,
            period,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run a single tick; returns the number of points updated
    pub fn tick(&self) -> usize {
        let updated = self.registry.update_all(self.time.now_millis());
        self.ticks.fetch_add(1, Ordering::Relaxed);
        updated
    }

    /// Tick every period until `token` is cancelled
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Simulation clock started: {} points every {:?}",
            self.registry.len(),
            self.period
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let updated = self.tick();
                    debug!("Tick {}: {} points updated", self.ticks(), updated);
                }
            }
        }

        info!("Simulation clock stopped after {} ticks", self.ticks());
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::config::PointDefinition;
    use crate::time::ManualTimeProvider;
    use crate::waveform::SimulationType;

    #[test]
    fn test_tick_uses_time_provider() {
        let time = Arc::new(ManualTimeProvider::new(0));
        let def = PointDefinition::analog("ramp", "", 0.0, 0.0, 60.0)
            .with_simulation(SimulationType::SawtoothRamp)
            .with_noise(0.0);
        let registry = Arc::new(Registry::from_definitions(&[def], 0, 1));
        let clock = SimulationClock::new(registry.clone(), time.clone(), DEFAULT_TICK);

        time.advance(15_000);
        assert_eq!(clock.tick(), 1);
        assert_eq!(registry.snapshot()["ramp"], 15.0);
        assert_eq!(clock.ticks(), 1);
    }

    #[test]
    fn test_zero_period_falls_back() {
        let clock = SimulationClock::new(
            Arc::new(Registry::new()),
            Arc::new(ManualTimeProvider::new(0)),
            Duration::ZERO,
        );
        assert_eq!(clock.period(), DEFAULT_TICK);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let clock = Arc::new(SimulationClock::new(
            Arc::new(Registry::new()),
            Arc::new(ManualTimeProvider::new(0)),
            Duration::from_millis(10),
        ));
        let token = CancellationToken::new();
        let task = tokio::spawn(clock.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(clock.ticks() >= 1);
    }
}
