//! 16-level command priority array
//!
//! Level 1 is the highest precedence, level 16 the lowest. The active command
//! is the value at the lowest-numbered occupied slot; there is no blending.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CommandError;

/// Number of command slots on every writable point
pub const PRIORITY_LEVELS: usize = 16;

/// Priority used when a writer does not specify one
pub const DEFAULT_WRITE_PRIORITY: u8 = 16;

/// Validated priority level in `1..=16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(PRIORITY_LEVELS as u8);

    pub fn new(level: u8) -> Option<Self> {
        (1..=PRIORITY_LEVELS as u8)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl Default for PriorityLevel {
    fn default() -> Self {
        Self::LOWEST
    }
}

impl TryFrom<u8> for PriorityLevel {
    type Error = CommandError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or(CommandError::OutOfRange(i64::from(level)))
    }
}

impl TryFrom<i64> for PriorityLevel {
    type Error = CommandError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        u8::try_from(level)
            .ok()
            .and_then(Self::new)
            .ok_or(CommandError::OutOfRange(level))
    }
}

impl<'de> Deserialize<'de> for PriorityLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(deserializer)?;
        Self::new(level).ok_or_else(|| {
            serde::de::Error::custom(format!("priority {} out of range 1..=16", level))
        })
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed 16-slot command array
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityArray([Option<f64>; PRIORITY_LEVELS]);

impl PriorityArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, level: PriorityLevel, value: f64) {
        self.0[level.index()] = Some(value);
    }

    /// Relinquish a slot
    pub fn clear(&mut self, level: PriorityLevel) {
        self.0[level.index()] = None;
    }

    pub fn get(&self, level: PriorityLevel) -> Option<f64> {
        self.0[level.index()]
    }

    /// Lowest-numbered occupied slot and its value
    pub fn active(&self) -> Option<(PriorityLevel, f64)> {
        self.0
            .iter()
            .enumerate()
            .find_map(|(idx, slot)| slot.map(|v| (PriorityLevel(idx as u8 + 1), v)))
    }

    pub fn active_value(&self) -> Option<f64> {
        self.active().map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn slots(&self) -> &[Option<f64>; PRIORITY_LEVELS] {
        &self.0
    }
}
