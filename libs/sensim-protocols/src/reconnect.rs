//! Exponential backoff between broker reconnect attempts

use rand::Rng;
use std::time::Duration;

/// `first × factor^n`, capped at `ceiling`, optionally spread ±25%
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub first: Duration,
    pub ceiling: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            ceiling: Duration::from_secs(60),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Un-jittered delay for the `n`th consecutive failure (0-based)
    fn base_delay(&self, n: u32) -> Duration {
        let secs = self.first.as_secs_f64() * self.factor.powi(n.min(64) as i32);
        if secs.is_finite() && secs < self.ceiling.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.ceiling
        }
    }
}

/// Failure counter over a [`ReconnectPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Attempts since the last [`reset`](Self::reset)
    pub fn attempt(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = self.policy.base_delay(self.failures);
        self.failures = self.failures.saturating_add(1);

        if !self.policy.jitter || base.is_zero() {
            return base;
        }
        let spread = rand::thread_rng().gen_range(0.75..=1.25);
        base.mul_f64(spread)
    }
}
