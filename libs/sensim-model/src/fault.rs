//! Fault injection model

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownFaultKind;
use crate::waveform::jitter;

/// Per-tick probability that a spike fault fires
pub const SPIKE_FAULT_CHANCE: f64 = 0.05;

/// Extra noise amplitude when a noise fault carries no value
pub const DEFAULT_NOISE_FAULT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// Hold the output at a fixed value, ignoring commands
    Freeze,
    Offset,
    Noise,
    Spike,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Offset => "offset",
            Self::Noise => "noise",
            Self::Spike => "spike",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultKind {
    type Err = UnknownFaultKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freeze" => Ok(Self::Freeze),
            "offset" => Ok(Self::Offset),
            "noise" => Ok(Self::Noise),
            "spike" => Ok(Self::Spike),
            other => Err(UnknownFaultKind(other.to_string())),
        }
    }
}

/// Active fault on a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    #[serde(rename = "type")]
    pub kind: FaultKind,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Fault {
    pub fn new(kind: FaultKind, value: Option<f64>) -> Self {
        Self { kind, value }
    }

    pub fn is_freeze(&self) -> bool {
        self.kind == FaultKind::Freeze
    }

    /// Additive contribution of a non-freeze fault for one tick
    pub fn additive(&self, range: f64, rng: &mut dyn RngCore) -> f64 {
        match self.kind {
            FaultKind::Freeze => 0.0,
            FaultKind::Offset => self.value.unwrap_or(0.0),
            FaultKind::Noise => jitter(rng, self.value.unwrap_or(DEFAULT_NOISE_FAULT)),
            FaultKind::Spike => {
                if rng.gen::<f64>() < SPIKE_FAULT_CHANCE {
                    self.value.unwrap_or(range * 0.5)
                } else {
                    0.0
                }
            },
        }
    }
}
