//! Campus generator
//!
//! Expands `num_buildings` × templates into a point set plus the three
//! projection maps in a single pass; every map references only generated
//! points.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use sensim_model::{PointDefinition, PointSetFile, SimulationType};

use crate::error::{MapError, MapResult};
use crate::object::{is_binary_point, ObjectId, ObjectMap, ObjectType};
use crate::register::{RegisterEntry, RegisterMap, RegisterTable};
use crate::topic::{TopicMap, DEFAULT_TOPIC_PREFIX};

pub const DEFAULT_NUM_BUILDINGS: u32 = 50;

pub const SENSORS_FILE: &str = "sensors.yaml";
pub const REGISTER_MAP_FILE: &str = "modbus_map.yaml";
pub const OBJECT_MAP_FILE: &str = "bacnet_map.yaml";
pub const TOPIC_MAP_FILE: &str = "mqtt_map.yaml";

fn default_num_buildings() -> u32 {
    DEFAULT_NUM_BUILDINGS
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    #[serde(default = "default_num_buildings")]
    pub num_buildings: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            num_buildings: DEFAULT_NUM_BUILDINGS,
        }
    }
}

/// Register table a template lands in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModbusCategory {
    Ir,
    Di,
    Hr,
    #[default]
    None,
}

impl ModbusCategory {
    pub fn table(&self) -> Option<RegisterTable> {
        match self {
            Self::Ir => Some(RegisterTable::InputRegisters),
            Self::Di => Some(RegisterTable::DiscreteInputs),
            Self::Hr => Some(RegisterTable::HoldingRegisters),
            Self::None => None,
        }
    }
}

/// One per-building point pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTemplate {
    pub suffix: String,
    #[serde(default)]
    pub unit: String,
    pub base: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub writable: bool,
    #[serde(rename = "type", default)]
    pub simulation_type: SimulationType,
    #[serde(default)]
    pub modbus: ModbusCategory,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub noise: Option<f64>,
    #[serde(default)]
    pub period: Option<f64>,
    #[serde(default)]
    pub spike_chance: Option<f64>,
    #[serde(default)]
    pub spike_multiplier: Option<f64>,
    #[serde(default)]
    pub pulse_width: Option<f64>,
}

impl PointTemplate {
    pub fn new(suffix: impl Into<String>, unit: impl Into<String>, base: f64, min: f64, max: f64) -> Self {
        Self {
            suffix: suffix.into(),
            unit: unit.into(),
            base,
            min,
            max,
            writable: false,
            simulation_type: SimulationType::default(),
            modbus: ModbusCategory::None,
            scale: 1.0,
            noise: None,
            period: None,
            spike_chance: None,
            spike_multiplier: None,
            pulse_width: None,
        }
    }

    pub fn with_modbus(mut self, modbus: ModbusCategory) -> Self {
        self.modbus = modbus;
        self
    }

    pub fn with_simulation(mut self, simulation_type: SimulationType) -> Self {
        self.simulation_type = simulation_type;
        self
    }

    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    fn validate(&self) -> MapResult<()> {
        let invalid = |reason: &str| MapError::InvalidTemplate {
            suffix: self.suffix.clone(),
            reason: reason.to_string(),
        };
        if self.suffix.trim().is_empty() {
            return Err(invalid("suffix must not be empty"));
        }
        if self.min > self.max {
            return Err(invalid("min must not exceed max"));
        }
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(invalid("scale must be finite and non-zero"));
        }
        Ok(())
    }

    fn point(&self, name: String) -> PointDefinition {
        let mut def = PointDefinition::analog(name, self.unit.clone(), self.base, self.min, self.max)
            .with_writable(self.writable)
            .with_simulation(self.simulation_type);
        if let Some(noise) = self.noise {
            def.noise = noise;
        }
        if let Some(period) = self.period {
            def.period = period;
        }
        if let Some(chance) = self.spike_chance {
            def.spike_chance = chance;
        }
        if let Some(multiplier) = self.spike_multiplier {
            def.spike_multiplier = multiplier;
        }
        if let Some(width) = self.pulse_width {
            def.pulse_width = width;
        }
        def
    }
}

/// `generator_presets.yaml` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorPresets {
    #[serde(default)]
    pub settings: GeneratorSettings,
    #[serde(default)]
    pub templates: Vec<PointTemplate>,
}

impl GeneratorPresets {
    pub fn load(path: &Path) -> MapResult<Self> {
        crate::maps::read_yaml(path)
    }
}

/// Output of one generation run
#[derive(Debug, Clone, Default)]
pub struct GeneratedConfig {
    pub points: Vec<PointDefinition>,
    pub registers: RegisterMap,
    pub objects: ObjectMap,
    pub topics: TopicMap,
}

pub fn building_id(index: u32) -> String {
    format!("building_{}", index)
}

/// Expand presets into points and maps
pub fn generate(presets: &GeneratorPresets) -> MapResult<GeneratedConfig> {
    for template in &presets.templates {
        template.validate()?;
    }

    let mut config = GeneratedConfig::default();
    let mut next_address: HashMap<RegisterTable, u32> = RegisterTable::ALL
        .into_iter()
        .map(|t| (t, t.base()))
        .collect();
    let mut next_av = 1;
    let mut next_bv = 1;

    for index in 1..=presets.settings.num_buildings {
        let building = building_id(index);
        for template in &presets.templates {
            let name = format!("{}_{}", building, template.suffix);
            let def = template.point(name.clone());

            if let Some(table) = template.modbus.table() {
                let address = next_address.entry(table).or_insert(table.base());
                if table.wire_offset(*address).is_none() {
                    return Err(MapError::Inconsistent(format!(
                        "{} table exhausted at point '{}'",
                        table, name
                    )));
                }
                let entry = match table {
                    RegisterTable::DiscreteInputs => RegisterEntry::new(name.clone()),
                    RegisterTable::HoldingRegisters => {
                        RegisterEntry::new(name.clone()).with_scale(template.scale).writable()
                    },
                    _ => RegisterEntry::new(name.clone()).with_scale(template.scale),
                };
                config.registers.insert(table, *address, entry);
                *address += 1;
            }

            let id = if is_binary_point(&def) {
                next_bv += 1;
                ObjectId::new(ObjectType::BinaryValue, next_bv - 1)
            } else {
                next_av += 1;
                ObjectId::new(ObjectType::AnalogValue, next_av - 1)
            };
            config.objects.insert(id, name.clone());

            config.topics.insert(
                name,
                format!("{}/{}/{}", DEFAULT_TOPIC_PREFIX, building, template.suffix),
            );
            config.points.push(def);
        }
    }

    config.validate()?;
    info!(
        "Generated {} points across {} buildings",
        config.points.len(),
        presets.settings.num_buildings
    );
    Ok(config)
}

impl GeneratedConfig {
    /// Check that every point is projected exactly once per protocol
    pub fn validate(&self) -> MapResult<()> {
        let mut names = HashSet::new();
        for def in &self.points {
            if !names.insert(def.name.as_str()) {
                return Err(MapError::DuplicatePoint(def.name.clone()));
            }
        }

        let mut register_slots: HashMap<&str, usize> = HashMap::new();
        for (table, address, entry) in self.registers.iter() {
            if !names.contains(entry.point.as_str()) {
                return Err(MapError::Inconsistent(format!(
                    "{}:{} references unknown point '{}'",
                    table, address, entry.point
                )));
            }
            *register_slots.entry(entry.point.as_str()).or_default() += 1;
        }
        if let Some((point, _)) = register_slots.iter().find(|(_, count)| **count > 1) {
            return Err(MapError::Inconsistent(format!(
                "point '{}' occupies more than one register slot",
                point
            )));
        }

        let by_point = self.objects.by_point();
        for (point, ids) in &by_point {
            if !names.contains(point) {
                return Err(MapError::Inconsistent(format!(
                    "object {} references unknown point '{}'",
                    ids[0], point
                )));
            }
        }

        let mut topics = HashSet::new();
        for name in &names {
            match by_point.get(name).map(Vec::len) {
                Some(1) => {},
                count => {
                    return Err(MapError::Inconsistent(format!(
                        "point '{}' has {} objects",
                        name,
                        count.unwrap_or(0)
                    )))
                },
            }
            let topic = self.topics.topic(name).ok_or_else(|| {
                MapError::Inconsistent(format!("point '{}' has no topic", name))
            })?;
            if !topics.insert(topic) {
                return Err(MapError::Inconsistent(format!("duplicate topic '{}'", topic)));
            }
        }
        if self.topics.len() != names.len() {
            return Err(MapError::Inconsistent(
                "topic map references unknown points".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the four configuration files into `dir`
    pub fn write_to_dir(&self, dir: &Path) -> MapResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| MapError::Write {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let sensors = PointSetFile {
            sensors: self.points.clone(),
        };
        write_yaml(&dir.join(SENSORS_FILE), &sensors)?;
        write_yaml(&dir.join(REGISTER_MAP_FILE), &self.registers.to_file())?;
        write_yaml(&dir.join(OBJECT_MAP_FILE), &self.objects.to_file())?;
        write_yaml(&dir.join(TOPIC_MAP_FILE), &self.topics.to_file())?;
        Ok(())
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> MapResult<()> {
    let content = serde_yaml::to_string(value).map_err(|e| MapError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|e| MapError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!("Wrote {:?}", path);
    Ok(())
}
