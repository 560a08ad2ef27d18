//! Object-model protocol port
//!
//! Commandable analog/binary value objects with a present value and a
//! 16-slot priority array. [`ObjectStore`] is the in-memory object database
//! an object-protocol stack would serve from.

pub mod frontend;

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

use sensim_model::PRIORITY_LEVELS;
use sensim_routing::{ObjectId, ObjectType};

use crate::error::PortError;

pub use frontend::ObjectFrontend;

pub const NO_UNITS: &str = "noUnits";

/// Binary present-value encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryPv {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    Null,
    Real(f64),
    Enumerated(BinaryPv),
}

impl PropertyValue {
    /// Encode a point value for an object of `object_type`
    pub fn encode(object_type: ObjectType, value: Option<f64>) -> Self {
        match value {
            None => Self::Null,
            Some(v) if object_type.is_binary() => Self::Enumerated(if v >= 0.5 {
                BinaryPv::Active
            } else {
                BinaryPv::Inactive
            }),
            Some(v) => Self::Real(v),
        }
    }

    /// Numeric value carried by the property; `None` for Null
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Real(v) => Some(*v),
            Self::Enumerated(BinaryPv::Active) => Some(1.0),
            Self::Enumerated(BinaryPv::Inactive) => Some(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyId {
    PresentValue,
    PriorityArray,
    ObjectName,
    Description,
    Units,
    RelinquishDefault,
}

/// One object as held by the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub object_name: String,
    pub description: String,
    pub units: String,
    pub present_value: PropertyValue,
    pub priority_array: [PropertyValue; PRIORITY_LEVELS],
    pub relinquish_default: PropertyValue,
}

impl ObjectRecord {
    pub fn new(id: ObjectId, point: &str, unit: &str) -> Self {
        let relinquish_default = PropertyValue::encode(id.object_type, Some(0.0));
        Self {
            id,
            object_name: point.to_string(),
            description: format!("Simulated {}", point),
            units: if unit.is_empty() || id.object_type.is_binary() {
                NO_UNITS.to_string()
            } else {
                unit.to_string()
            },
            present_value: relinquish_default,
            priority_array: [PropertyValue::Null; PRIORITY_LEVELS],
            relinquish_default,
        }
    }
}

/// Outbound side: the front-end mirrors point state here
pub trait ObjectPort: Send + Sync {
    fn create_object(&self, record: ObjectRecord) -> Result<(), PortError>;

    fn set_present_value(&self, id: ObjectId, value: PropertyValue) -> Result<(), PortError>;

    fn set_priority_array(
        &self,
        id: ObjectId,
        slots: [PropertyValue; PRIORITY_LEVELS],
    ) -> Result<(), PortError>;
}

/// Inbound write-property request
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object: ObjectId,
    pub property: PropertyId,
    pub value: PropertyValue,
    /// Command priority; 16 when absent
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    pub fn present_value(object: ObjectId, value: PropertyValue, priority: Option<u8>) -> Self {
        Self {
            object,
            property: PropertyId::PresentValue,
            value,
            priority,
        }
    }
}

/// Inbound side: write-property dispatch
pub trait WritePropertyHandler: Send + Sync {
    fn write_property(&self, request: &WritePropertyRequest) -> Result<(), crate::error::ObjectError>;
}

#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: RwLock<BTreeMap<ObjectId, ObjectRecord>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: &ObjectId) -> Option<ObjectRecord> {
        self.objects.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.read().keys().copied().collect()
    }
}

impl ObjectPort for ObjectStore {
    fn create_object(&self, record: ObjectRecord) -> Result<(), PortError> {
        self.objects.write().insert(record.id, record);
        Ok(())
    }

    fn set_present_value(&self, id: ObjectId, value: PropertyValue) -> Result<(), PortError> {
        let mut objects = self.objects.write();
        let record = objects.get_mut(&id).ok_or(PortError::UnknownObject(id))?;
        record.present_value = value;
        Ok(())
    }

    fn set_priority_array(
        &self,
        id: ObjectId,
        slots: [PropertyValue; PRIORITY_LEVELS],
    ) -> Result<(), PortError> {
        let mut objects = self.objects.write();
        let record = objects.get_mut(&id).ok_or(PortError::UnknownObject(id))?;
        record.priority_array = slots;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(
            PropertyValue::encode(ObjectType::BinaryValue, Some(1.0)),
            PropertyValue::Enumerated(BinaryPv::Active)
        );
        assert_eq!(
            PropertyValue::encode(ObjectType::BinaryInput, Some(0.2)),
            PropertyValue::Enumerated(BinaryPv::Inactive)
        );
        assert_eq!(
            PropertyValue::encode(ObjectType::AnalogValue, Some(3.5)),
            PropertyValue::Real(3.5)
        );
        assert_eq!(PropertyValue::encode(ObjectType::AnalogValue, None), PropertyValue::Null);
        assert_eq!(PropertyValue::Enumerated(BinaryPv::Active).as_f64(), Some(1.0));
    }

    #[test]
    fn test_record_defaults() {
        let av = ObjectRecord::new(ObjectId::new(ObjectType::AnalogValue, 1), "temp", "C");
        assert_eq!(av.description, "Simulated temp");
        assert_eq!(av.units, "C");
        assert_eq!(av.relinquish_default, PropertyValue::Real(0.0));

        let bv = ObjectRecord::new(ObjectId::new(ObjectType::BinaryValue, 1), "fan", "bool");
        assert_eq!(bv.units, NO_UNITS);
        assert_eq!(
            bv.relinquish_default,
            PropertyValue::Enumerated(BinaryPv::Inactive)
        );
    }

    #[test]
    fn test_store_updates_known_objects_only() {
        let store = ObjectStore::new();
        let id = ObjectId::new(ObjectType::AnalogValue, 1);
        store.create_object(ObjectRecord::new(id, "temp", "C")).unwrap();

        store.set_present_value(id, PropertyValue::Real(21.0)).unwrap();
        assert_eq!(store.object(&id).unwrap().present_value, PropertyValue::Real(21.0));

        let missing = ObjectId::new(ObjectType::AnalogValue, 2);
        assert_eq!(
            store.set_present_value(missing, PropertyValue::Null),
            Err(PortError::UnknownObject(missing))
        );
    }
}
