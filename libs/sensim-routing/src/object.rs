//! Object-model projection: `(object type, instance)` to point

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use sensim_model::{PointDefinition, PointKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    AnalogValue,
    BinaryValue,
    AnalogInput,
    BinaryInput,
    MultiStateValue,
}

impl ObjectType {
    pub const ALL: [ObjectType; 5] = [
        Self::AnalogValue,
        Self::BinaryValue,
        Self::AnalogInput,
        Self::BinaryInput,
        Self::MultiStateValue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AnalogValue => "AV",
            Self::BinaryValue => "BV",
            Self::AnalogInput => "AI",
            Self::BinaryInput => "BI",
            Self::MultiStateValue => "MSV",
        }
    }

    /// Key used in `bacnet_map.yaml`
    pub fn key(&self) -> &'static str {
        match self {
            Self::AnalogValue => "analogValue",
            Self::BinaryValue => "binaryValue",
            Self::AnalogInput => "analogInput",
            Self::BinaryInput => "binaryInput",
            Self::MultiStateValue => "multiStateValue",
        }
    }

    /// Present value encoded as active/inactive
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::BinaryValue | Self::BinaryInput)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.key() == s || t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown object type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectId {
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type.label(), self.instance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    #[serde(rename = "sensor")]
    pub point: String,
}

/// `bacnet_map.yaml` document: object type key, then instance
pub type ObjectMapFile = BTreeMap<String, BTreeMap<u32, ObjectEntry>>;

/// True when a point should surface as a binary object
pub fn is_binary_point(def: &PointDefinition) -> bool {
    def.kind == PointKind::Binary || def.unit == "bool"
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMap {
    objects: BTreeMap<ObjectId, String>,
}

impl ObjectMap {
    pub fn from_file(file: &ObjectMapFile, known: impl Fn(&str) -> bool) -> Self {
        let mut map = Self::default();
        for (key, instances) in file {
            let object_type = match key.parse::<ObjectType>() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Object map: {}, section skipped", e);
                    continue;
                },
            };
            for (instance, entry) in instances {
                if !known(&entry.point) {
                    warn!(
                        "Object {}:{} references unknown point '{}', skipped",
                        object_type.label(),
                        instance,
                        entry.point
                    );
                    continue;
                }
                map.objects
                    .insert(ObjectId::new(object_type, *instance), entry.point.clone());
            }
        }
        map
    }

    /// Analog/binary value objects numbered from 1 in name order
    pub fn default_for(points: &[PointDefinition]) -> Self {
        let mut sorted: Vec<&PointDefinition> = points.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted.dedup_by(|a, b| a.name == b.name);

        let mut map = Self::default();
        let mut next_av = 1;
        let mut next_bv = 1;
        for def in sorted {
            let id = if is_binary_point(def) {
                next_bv += 1;
                ObjectId::new(ObjectType::BinaryValue, next_bv - 1)
            } else {
                next_av += 1;
                ObjectId::new(ObjectType::AnalogValue, next_av - 1)
            };
            map.objects.insert(id, def.name.clone());
        }
        map
    }

    pub fn insert(&mut self, id: ObjectId, point: impl Into<String>) {
        self.objects.insert(id, point.into());
    }

    pub fn point(&self, id: &ObjectId) -> Option<&str> {
        self.objects.get(id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &str)> {
        self.objects.iter().map(|(id, name)| (id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Labels such as `BACnet AV:1`, grouped by point
    pub fn labels(&self) -> BTreeMap<String, Vec<String>> {
        let mut labels: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, name) in &self.objects {
            labels
                .entry(name.clone())
                .or_default()
                .push(format!("BACnet {}", id));
        }
        labels
    }

    /// Objects per point, for consistency checks
    pub fn by_point(&self) -> HashMap<&str, Vec<ObjectId>> {
        let mut by_point: HashMap<&str, Vec<ObjectId>> = HashMap::new();
        for (id, name) in &self.objects {
            by_point.entry(name.as_str()).or_default().push(*id);
        }
        by_point
    }

    pub fn to_file(&self) -> ObjectMapFile {
        let mut file = ObjectMapFile::new();
        for (id, name) in &self.objects {
            file.entry(id.object_type.key().to_string())
                .or_default()
                .insert(
                    id.instance,
                    ObjectEntry {
                        point: name.clone(),
                    },
                );
        }
        file
    }
}
