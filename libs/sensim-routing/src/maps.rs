//! Loading the three projection maps together

use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sensim_model::PointDefinition;

use crate::error::{MapError, MapResult};
use crate::object::{ObjectMap, ObjectMapFile};
use crate::register::{RegisterMap, RegisterMapFile};
use crate::topic::{TopicMap, TopicMapFile};

/// Locations of the map files; `None` means use the default projection
#[derive(Debug, Clone, Default)]
pub struct MapPaths {
    pub registers: Option<PathBuf>,
    pub objects: Option<PathBuf>,
    pub topics: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionMaps {
    pub registers: RegisterMap,
    pub objects: ObjectMap,
    pub topics: TopicMap,
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> MapResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| MapError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a map file, or `None` when it is unset, missing or unreadable
fn read_optional<T: DeserializeOwned>(kind: &str, path: Option<&Path>) -> Option<T> {
    let path = path?;
    if !path.exists() {
        info!("{} map {:?} not found, using default mapping", kind, path);
        return None;
    }
    match read_yaml(path) {
        Ok(file) => {
            info!("Loaded {} map from {:?}", kind, path);
            Some(file)
        },
        Err(e) => {
            warn!("{} map unusable ({}), using default mapping", kind, e);
            None
        },
    }
}

impl ProjectionMaps {
    /// Sorted-name defaults for all three protocols
    pub fn defaults(points: &[PointDefinition]) -> Self {
        Self {
            registers: RegisterMap::default_for(points),
            objects: ObjectMap::default_for(points),
            topics: TopicMap::default_for(points),
        }
    }

    /// Load each map independently, falling back per map
    pub fn load(paths: &MapPaths, points: &[PointDefinition]) -> Self {
        let names: HashSet<&str> = points.iter().map(|p| p.name.as_str()).collect();
        let known = |name: &str| names.contains(name);

        let registers = read_optional::<RegisterMapFile>("Register", paths.registers.as_deref())
            .map(|file| RegisterMap::from_file(&file, known))
            .unwrap_or_else(|| RegisterMap::default_for(points));

        let objects = read_optional::<ObjectMapFile>("Object", paths.objects.as_deref())
            .map(|file| ObjectMap::from_file(&file, known))
            .unwrap_or_else(|| ObjectMap::default_for(points));

        let topics = read_optional::<TopicMapFile>("Topic", paths.topics.as_deref())
            .map(|file| TopicMap::from_file(&file, known))
            .unwrap_or_else(|| TopicMap::default_for(points));

        info!(
            "Projection: {} register entries, {} objects, {} topics",
            registers.len(),
            objects.len(),
            topics.len()
        );

        Self {
            registers,
            objects,
            topics,
        }
    }

    /// Protocol labels per point, register labels first
    pub fn protocol_labels(&self) -> BTreeMap<String, Vec<String>> {
        let mut labels = self.registers.labels();
        for (point, object_labels) in self.objects.labels() {
            labels.entry(point).or_default().extend(object_labels);
        }
        labels
    }
}
