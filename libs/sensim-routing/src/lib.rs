//! Protocol projection layer
//!
//! One point namespace projected onto three addressing schemes: register
//! tables, typed object instances and telemetry topics. Maps are built once
//! at startup (from files or sorted-name defaults) and never mutated, or
//! produced together by the campus [`generator`].

pub mod error;
pub mod generator;
pub mod maps;
pub mod object;
pub mod register;
pub mod topic;

pub use error::{MapError, MapResult};
pub use generator::{generate, GeneratedConfig, GeneratorPresets, ModbusCategory, PointTemplate};
pub use maps::{MapPaths, ProjectionMaps};
pub use object::{ObjectEntry, ObjectId, ObjectMap, ObjectMapFile, ObjectType};
pub use register::{RegisterEntry, RegisterMap, RegisterMapFile, RegisterTable};
pub use topic::{TopicMap, TopicMapFile, DEFAULT_TOPIC_PREFIX};
