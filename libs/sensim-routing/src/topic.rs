//! Telemetry topic projection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use sensim_model::PointDefinition;

pub const DEFAULT_TOPIC_PREFIX: &str = "campus";

/// `mqtt_map.yaml` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicMapFile {
    #[serde(default)]
    pub topics: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicMap {
    topics: BTreeMap<String, String>,
}

impl TopicMap {
    pub fn from_file(file: &TopicMapFile, known: impl Fn(&str) -> bool) -> Self {
        let topics = file
            .topics
            .iter()
            .filter(|(name, topic)| {
                if !known(name) {
                    warn!("Topic '{}' references unknown point '{}', skipped", topic, name);
                    return false;
                }
                if topic.trim().is_empty() {
                    warn!("Empty topic for point '{}', skipped", name);
                    return false;
                }
                true
            })
            .map(|(name, topic)| (name.clone(), topic.clone()))
            .collect();
        Self { topics }
    }

    /// `campus/<name>` for every point
    pub fn default_for(points: &[PointDefinition]) -> Self {
        let topics = points
            .iter()
            .map(|p| (p.name.clone(), format!("{}/{}", DEFAULT_TOPIC_PREFIX, p.name)))
            .collect();
        Self { topics }
    }

    pub fn insert(&mut self, point: impl Into<String>, topic: impl Into<String>) {
        self.topics.insert(point.into(), topic.into());
    }

    pub fn topic(&self, point: &str) -> Option<&str> {
        self.topics.get(point).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.topics.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn to_file(&self) -> TopicMapFile {
        TopicMapFile {
            topics: self.topics.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_topics() {
        let points = vec![PointDefinition::analog("temperature", "C", 0.0, 0.0, 1.0)];
        let map = TopicMap::default_for(&points);
        assert_eq!(map.topic("temperature"), Some("campus/temperature"));
    }

    #[test]
    fn test_from_file_filters_unknown_and_empty() {
        let yaml = "topics:\n  a: campus/b1/a\n  ghost: campus/x\n  b: ''\n";
        let file: TopicMapFile = serde_yaml::from_str(yaml).unwrap();
        let map = TopicMap::from_file(&file, |n| n == "a" || n == "b");
        assert_eq!(map.len(), 1);
        assert_eq!(map.topic("a"), Some("campus/b1/a"));
    }
}
