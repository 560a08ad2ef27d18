//! Where the simulation clock gets "now" from
//!
//! Waveforms are functions of elapsed time, so every update takes an explicit
//! millisecond timestamp. The service reads the wall clock; tests pin or step
//! it by hand.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime};

pub trait TimeProvider: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        let since_epoch = SystemTime::UNIX_EPOCH
            .elapsed()
            .unwrap_or(Duration::ZERO);
        i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Always answers the same instant
#[derive(Clone, Copy, Debug)]
pub struct FixedTimeProvider(i64);

impl FixedTimeProvider {
    pub fn new(at_ms: i64) -> Self {
        Self(at_ms)
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Stepped by the caller with [`advance`](Self::advance) or [`set`](Self::set)
#[derive(Debug, Default)]
pub struct ManualTimeProvider {
    at_ms: AtomicI64,
}

impl ManualTimeProvider {
    pub fn new(at_ms: i64) -> Self {
        Self {
            at_ms: AtomicI64::new(at_ms),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.at_ms.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, at_ms: i64) {
        self.at_ms.store(at_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now_millis(&self) -> i64 {
        self.at_ms.load(Ordering::SeqCst)
    }
}
