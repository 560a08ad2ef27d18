//! Point set configuration
//!
//! `sensors.yaml` lists one definition per point under a `sensors` key
//! (`points` is accepted too). A missing or malformed file falls back to a
//! small default set so the simulator always has something to serve.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ConfigError, ModelResult};
use crate::waveform::{SimulationType, WaveParams};

fn default_noise() -> f64 {
    0.1
}

fn default_period() -> f64 {
    1.0
}

fn default_spike_chance() -> f64 {
    0.05
}

fn default_spike_multiplier() -> f64 {
    1.5
}

fn default_pulse_width() -> f64 {
    1.0
}

fn default_max() -> f64 {
    1.0
}

fn is_analog(kind: &PointKind) -> bool {
    *kind == PointKind::Analog
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    #[default]
    Analog,
    Binary,
}

/// Alarm model driving a binary point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmModel {
    /// Per-tick probability of the point reading active
    pub trigger_probability: f64,
}

/// One point as written in the point set file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDefinition {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(rename = "type", default, skip_serializing_if = "is_analog")]
    pub kind: PointKind,
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub simulation_type: SimulationType,
    #[serde(default = "default_noise")]
    pub noise: f64,
    #[serde(default = "default_period")]
    pub period: f64,
    #[serde(default = "default_spike_chance")]
    pub spike_chance: f64,
    #[serde(default = "default_spike_multiplier")]
    pub spike_multiplier: f64,
    #[serde(default = "default_pulse_width")]
    pub pulse_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmModel>,
}

impl PointDefinition {
    /// Analog definition with default simulation parameters
    pub fn analog(name: impl Into<String>, unit: impl Into<String>, base: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            kind: PointKind::Analog,
            base,
            min,
            max,
            writable: false,
            simulation_type: SimulationType::default(),
            noise: default_noise(),
            period: default_period(),
            spike_chance: default_spike_chance(),
            spike_multiplier: default_spike_multiplier(),
            pulse_width: default_pulse_width(),
            alarm: None,
        }
    }

    /// Binary definition driven by an alarm probability
    pub fn binary(name: impl Into<String>, trigger_probability: f64) -> Self {
        Self {
            kind: PointKind::Binary,
            unit: "bool".to_string(),
            alarm: Some(AlarmModel {
                trigger_probability,
            }),
            ..Self::analog(name, "", 0.0, 0.0, 1.0)
        }
    }

    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn with_simulation(mut self, simulation_type: SimulationType) -> Self {
        self.simulation_type = simulation_type;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    /// Waveform parameters with a non-positive period replaced by 1 s
    pub fn wave_params(&self) -> WaveParams {
        WaveParams {
            base: self.base,
            min: self.min,
            max: self.max,
            noise: self.noise,
            period: if self.period > 0.0 && self.period.is_finite() {
                self.period
            } else {
                default_period()
            },
            spike_chance: self.spike_chance,
            spike_multiplier: self.spike_multiplier,
            pulse_width: self.pulse_width,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |reason: &str| ConfigError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !(self.min.is_finite() && self.max.is_finite() && self.base.is_finite()) {
            return Err(invalid("base, min and max must be finite"));
        }
        if self.min > self.max {
            return Err(invalid("min must not exceed max"));
        }
        if let Some(alarm) = &self.alarm {
            if !(0.0..=1.0).contains(&alarm.trigger_probability) {
                return Err(invalid("alarm.trigger_probability must be within 0..=1"));
            }
        }
        Ok(())
    }
}

/// Root of the point set file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSetFile {
    #[serde(alias = "points")]
    pub sensors: Vec<PointDefinition>,
}

/// Built-in point set used when no file is available
pub fn default_points() -> Vec<PointDefinition> {
    vec![
        PointDefinition::analog("temperature", "C", 22.0, -10.0, 50.0).with_writable(true),
        PointDefinition::analog("humidity", "%", 50.0, 0.0, 100.0).with_writable(true),
        PointDefinition::analog("pressure", "Pa", 101_325.0, 98_000.0, 105_000.0)
            .with_writable(true),
    ]
}

/// Parse and validate a point set document
pub fn parse_point_set(content: &str, path: &Path) -> ModelResult<Vec<PointDefinition>> {
    let file: PointSetFile =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if file.sensors.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut seen = HashSet::new();
    for def in &file.sensors {
        def.validate()?;
        if !seen.insert(def.name.as_str()) {
            warn!("Duplicate point '{}' in {:?}, last definition wins", def.name, path);
        }
    }

    Ok(file.sensors)
}

/// Load a point set file
pub fn load_point_set(path: &Path) -> ModelResult<Vec<PointDefinition>> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_point_set(&content, path)
}

/// Load a point set file, falling back to [`default_points`] on any error
pub fn load_point_set_or_default(path: Option<&Path>) -> Vec<PointDefinition> {
    let Some(path) = path else {
        info!("No point set configured, using defaults");
        return default_points();
    };

    if !path.exists() {
        info!("Point set {:?} not found, using defaults", path);
        return default_points();
    }

    match load_point_set(path) {
        Ok(points) => {
            info!("Loaded {} points from {:?}", points.len(), path);
            points
        },
        Err(e) => {
            warn!("Point set unusable ({}), using defaults", e);
            default_points()
        },
    }
}
