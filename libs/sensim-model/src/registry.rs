//! Shared point registry
//!
//! Every point sits behind its own mutex; the name index sits behind one
//! `RwLock`. A tick takes the index write lock for the whole scan, so readers
//! holding the read lock never see a mix of pre- and post-tick values.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::config::PointDefinition;
use crate::error::CommandError;
use crate::fault::FaultKind;
use crate::point::{Point, PointView};
use crate::priority::PriorityLevel;

pub type PointHandle = Arc<Mutex<Point>>;

#[derive(Debug, Default)]
pub struct Registry {
    points: RwLock<HashMap<String, PointHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions; later duplicates overwrite earlier ones
    pub fn from_definitions(defs: &[PointDefinition], now_millis: i64, seed: u64) -> Self {
        let registry = Self::new();
        for def in defs {
            registry.add(Point::new(def, now_millis, seed));
        }
        registry
    }

    /// Insert or overwrite by name; returns true when an existing point was replaced
    pub fn add(&self, point: Point) -> bool {
        let name = point.name().to_string();
        let replaced = self
            .points
            .write()
            .insert(name.clone(), Arc::new(Mutex::new(point)))
            .is_some();
        if replaced {
            debug!("Point '{}' replaced", name);
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<PointHandle> {
        self.points.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.points.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Sorted point names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.points.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Update every point as one atomic tick; returns the number updated
    pub fn update_all(&self, now_millis: i64) -> usize {
        let points = self.points.write();
        for handle in points.values() {
            handle.lock().update(now_millis);
        }
        points.len()
    }

    /// Name to value map consistent at one instant
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let points = self.points.read();
        points
            .iter()
            .map(|(name, handle)| (name.clone(), handle.lock().value()))
            .collect()
    }

    /// Full views of every point, sorted by name
    pub fn views(&self) -> Vec<PointView> {
        let points = self.points.read();
        let mut views: Vec<PointView> = points.values().map(|h| h.lock().view()).collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    pub fn view(&self, name: &str) -> Option<PointView> {
        self.get(name).map(|h| h.lock().view())
    }

    /// Write (`Some`) or relinquish (`None`) a command at `level`
    pub fn command(
        &self,
        name: &str,
        level: impl Into<i64>,
        value: Option<f64>,
    ) -> Result<(), CommandError> {
        let handle = self
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        let level: i64 = level.into();
        let level = PriorityLevel::try_from(level)?;

        let mut point = handle.lock();
        if !point.is_writable() {
            return Err(CommandError::NotWritable(name.to_string()));
        }
        match value {
            Some(v) => point.set_priority(v, level.get()),
            None => point.clear_priority(level.get()),
        };
        Ok(())
    }

    pub fn set_fault(
        &self,
        name: &str,
        kind: FaultKind,
        value: Option<f64>,
    ) -> Result<(), CommandError> {
        let handle = self
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        handle.lock().set_fault(kind, value);
        Ok(())
    }

    pub fn clear_fault(&self, name: &str) -> Result<(), CommandError> {
        let handle = self
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        handle.lock().clear_fault();
        Ok(())
    }
}
