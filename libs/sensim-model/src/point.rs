//! Simulated point: waveform, fault model and command arbitration
//!
//! Resolution order on every update:
//! 1. freeze fault, which pins the output and ignores everything else
//! 2. active command from the priority array
//! 3. waveform (or alarm model for binaries), additive fault, clamp

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;
use serde::Serialize;
use std::hash::{Hash, Hasher};

use crate::config::{AlarmModel, PointDefinition, PointKind};
use crate::fault::{Fault, FaultKind};
use crate::priority::{PriorityArray, PriorityLevel};
use crate::waveform::{self, SimulationType, WaveInput, WaveParams};

/// Derive a per-point seed so points sharing a simulation seed diverge
fn point_seed(seed: u64, name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    seed ^ hasher.finish()
}

#[derive(Debug)]
pub struct Point {
    name: String,
    unit: String,
    kind: PointKind,
    simulation_type: SimulationType,
    params: WaveParams,
    writable: bool,
    alarm: Option<AlarmModel>,
    value: f64,
    priority: PriorityArray,
    fault: Option<Fault>,
    last_walk: f64,
    started_at_ms: i64,
    rng: StdRng,
}

impl Point {
    /// Build a point from its definition; `now_millis` is the waveform origin
    pub fn new(def: &PointDefinition, now_millis: i64, seed: u64) -> Self {
        let params = def.wave_params();
        Self {
            name: def.name.clone(),
            unit: def.unit.clone(),
            kind: def.kind,
            simulation_type: def.simulation_type,
            params,
            writable: def.writable,
            alarm: def.alarm,
            value: def.base,
            priority: PriorityArray::new(),
            fault: None,
            last_walk: def.base,
            started_at_ms: now_millis,
            rng: StdRng::seed_from_u64(point_seed(seed, &def.name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn simulation_type(&self) -> SimulationType {
        self.simulation_type
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn priority_array(&self) -> &PriorityArray {
        &self.priority
    }

    /// Direct assignment, bypassing simulation until the next update
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Recompute the output for `now_millis` and return it
    pub fn update(&mut self, now_millis: i64) -> f64 {
        if let Some(fault) = self.fault.filter(Fault::is_freeze) {
            if let Some(v) = fault.value {
                self.value = v;
            }
            return self.value;
        }

        if let Some(v) = self.priority.active_value() {
            self.value = v;
            return v;
        }

        if self.kind == PointKind::Binary {
            self.value = self.sample_alarm();
            return self.value;
        }

        let elapsed = (now_millis - self.started_at_ms).max(0) as f64 / 1000.0;
        let input = WaveInput {
            params: &self.params,
            elapsed,
            last_walk: self.last_walk,
        };
        let mut next = waveform::evaluate(self.simulation_type, &input, &mut self.rng);

        if let Some(fault) = self.fault {
            next += fault.additive(self.params.range(), &mut self.rng);
        }

        next = next.max(self.params.min).min(self.params.max);
        self.value = next;

        if self.simulation_type == SimulationType::BoundedRandomWalk {
            self.last_walk = next;
        }

        next
    }

    fn sample_alarm(&mut self) -> f64 {
        match self.alarm {
            Some(alarm) if self.rng.gen::<f64>() < alarm.trigger_probability => 1.0,
            _ => 0.0,
        }
    }

    /// Write a command at `level`; returns false when not applied
    pub fn set_priority(&mut self, value: f64, level: u8) -> bool {
        match PriorityLevel::new(level) {
            Some(level) if self.writable => {
                self.priority.set(level, value);
                true
            },
            _ => false,
        }
    }

    /// Relinquish the command at `level`; returns false when not applied
    pub fn clear_priority(&mut self, level: u8) -> bool {
        match PriorityLevel::new(level) {
            Some(level) if self.writable => {
                self.priority.clear(level);
                true
            },
            _ => false,
        }
    }

    pub fn set_fault(&mut self, kind: FaultKind, value: Option<f64>) {
        self.fault = Some(Fault::new(kind, value));
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Consistent copy of the externally visible state
    pub fn view(&self) -> PointView {
        PointView {
            name: self.name.clone(),
            unit: self.unit.clone(),
            kind: self.kind,
            simulation_type: self.simulation_type,
            value: self.value,
            min: self.params.min,
            max: self.params.max,
            writable: self.writable,
            fault: self.fault,
            active_priority: self.priority.active().map(|(level, _)| level.get()),
            priority_array: self.priority,
        }
    }
}

/// Read-only copy of a point taken under its lock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointView {
    pub name: String,
    pub unit: String,
    pub kind: PointKind,
    pub simulation_type: SimulationType,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub writable: bool,
    pub fault: Option<Fault>,
    pub active_priority: Option<u8>,
    pub priority_array: PriorityArray,
}
