//! Service configuration
//!
//! Loaded from `config/simsrv.yaml` (optional) with `SIMSRV_` environment
//! overrides; nested keys use a double underscore, e.g.
//! `SIMSRV_REGISTER__BIND=0.0.0.0:1502`. Every field has a default, so the
//! service starts without any file at all.

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use errors::{SimError, SimResult};
use sensim_model::PRIORITY_LEVELS;
use sensim_protocols::MqttConfig;
use sensim_routing::MapPaths;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REGISTER_PORT: u16 = 5020;
pub const DEFAULT_CONFIG_PATH: &str = "config/simsrv.yaml";

fn default_service_name() -> String {
    "simsrv".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_register_bind() -> String {
    format!("0.0.0.0:{}", DEFAULT_REGISTER_PORT)
}

fn default_write_priority() -> u8 {
    PRIORITY_LEVELS as u8
}

fn default_points_file() -> PathBuf {
    PathBuf::from("config/sensors.yaml")
}

fn default_register_map() -> PathBuf {
    PathBuf::from("config/modbus_map.yaml")
}

fn default_object_map() -> PathBuf {
    PathBuf::from("config/bacnet_map.yaml")
}

fn default_topic_map() -> PathBuf {
    PathBuf::from("config/mqtt_map.yaml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log root; `SIMSRV_LOG_DIR` takes precedence
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            host: default_host(),
            port: default_port(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Seed for the per-point generators; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_points_file")]
    pub points: PathBuf,
    #[serde(default = "default_register_map")]
    pub register_map: PathBuf,
    #[serde(default = "default_object_map")]
    pub object_map: PathBuf,
    #[serde(default = "default_topic_map")]
    pub topic_map: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            points: default_points_file(),
            register_map: default_register_map(),
            object_map: default_object_map(),
            topic_map: default_topic_map(),
        }
    }
}

impl FilesConfig {
    pub fn map_paths(&self) -> MapPaths {
        MapPaths {
            registers: Some(self.register_map.clone()),
            objects: Some(self.object_map.clone()),
            topics: Some(self.topic_map.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_register_bind")]
    pub bind: String,
    #[serde(default = "default_tick_ms")]
    pub update_ms: u64,
    #[serde(default = "default_write_priority")]
    pub write_priority: u8,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_register_bind(),
            update_ms: default_tick_ms(),
            write_priority: default_write_priority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tick_ms")]
    pub update_ms: u64,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Run the MQTT front-end at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Initial state of the runtime publish switch
    #[serde(default = "default_true")]
    pub publish_on_start: bool,
    #[serde(default = "default_tick_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            publish_on_start: true,
            interval_ms: default_tick_ms(),
            mqtt: MqttConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub register: RegisterConfig,
    #[serde(default)]
    pub object: ObjectConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SimConfig {
    /// Load from `path` (missing file is fine) plus `SIMSRV_` environment
    pub fn load(path: &Path) -> SimResult<Self> {
        let config: SimConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SIMSRV_").split("__"))
            .extract()
            .map_err(|e| SimError::Configuration(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |field: &str, reason: &str| SimError::InvalidConfig {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.simulation.tick_ms == 0 {
            return Err(invalid("simulation.tick_ms", "must be greater than zero"));
        }
        if self.register.update_ms == 0 {
            return Err(invalid("register.update_ms", "must be greater than zero"));
        }
        if self.object.update_ms == 0 {
            return Err(invalid("object.update_ms", "must be greater than zero"));
        }
        if self.telemetry.interval_ms == 0 {
            return Err(invalid("telemetry.interval_ms", "must be greater than zero"));
        }
        if !(1..=PRIORITY_LEVELS as u8).contains(&self.register.write_priority) {
            return Err(invalid("register.write_priority", "must be within 1..=16"));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.simulation.tick_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}
