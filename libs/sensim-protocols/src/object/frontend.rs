//! Object front-end: mirrors present value and priority array, routes
//! write-property into the priority array

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use sensim_model::{CommandError, Registry, DEFAULT_WRITE_PRIORITY, PRIORITY_LEVELS};
use sensim_routing::ObjectMap;

use super::{ObjectPort, ObjectRecord, PropertyId, PropertyValue, WritePropertyHandler, WritePropertyRequest};
use crate::error::{FrontendError, ObjectError, PortError};
use crate::frontend::Frontend;

pub struct ObjectFrontend {
    registry: Arc<Registry>,
    map: Arc<ObjectMap>,
    port: Arc<dyn ObjectPort>,
}

impl ObjectFrontend {
    pub fn new(registry: Arc<Registry>, map: Arc<ObjectMap>, port: Arc<dyn ObjectPort>) -> Self {
        Self {
            registry,
            map,
            port,
        }
    }

    /// Create one object per mapped point; returns the number created
    pub fn install(&self) -> Result<usize, PortError> {
        let mut created = 0;
        for (id, point) in self.map.iter() {
            let Some(view) = self.registry.view(point) else {
                warn!("Object {} maps missing point '{}'", id, point);
                continue;
            };
            self.port
                .create_object(ObjectRecord::new(*id, point, &view.unit))?;
            created += 1;
        }
        info!("Object front-end installed {} objects", created);
        Ok(created)
    }
}

#[async_trait]
impl Frontend for ObjectFrontend {
    fn name(&self) -> &'static str {
        "object"
    }

    async fn tick(&self) -> Result<usize, FrontendError> {
        let mut mirrored = 0;
        for (id, point) in self.map.iter() {
            let Some(view) = self.registry.view(point) else {
                continue;
            };
            let present_value = PropertyValue::encode(id.object_type, Some(view.value));
            let mut slots = [PropertyValue::Null; PRIORITY_LEVELS];
            for (slot, value) in slots.iter_mut().zip(view.priority_array.slots()) {
                *slot = PropertyValue::encode(id.object_type, *value);
            }

            self.port.set_present_value(*id, present_value)?;
            self.port.set_priority_array(*id, slots)?;
            mirrored += 1;
        }
        Ok(mirrored)
    }
}

impl WritePropertyHandler for ObjectFrontend {
    fn write_property(&self, request: &WritePropertyRequest) -> Result<(), ObjectError> {
        let object = request.object;
        let point = self
            .map
            .point(&object)
            .ok_or(ObjectError::UnknownObject(object))?;

        if request.property != PropertyId::PresentValue {
            return Err(ObjectError::WriteAccessDenied(format!(
                "{:?} of {} is read-only",
                request.property, object
            )));
        }

        let level = request.priority.unwrap_or(DEFAULT_WRITE_PRIORITY);
        let value = request.value.as_f64();
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(ObjectError::ValueOutOfRange(format!(
                "non-finite value for {}",
                object
            )));
        }

        self.registry
            .command(point, level, value)
            .map_err(|e| match e {
                CommandError::NotFound(_) => ObjectError::UnknownObject(object),
                CommandError::NotWritable(name) => ObjectError::WriteAccessDenied(name),
                CommandError::OutOfRange(level) => {
                    ObjectError::ValueOutOfRange(format!("priority {}", level))
                },
            })?;

        match value {
            Some(v) => debug!("WriteProperty {} = {} @{}", object, v, level),
            None => debug!("WriteProperty {} relinquish @{}", object, level),
        }
        Ok(())
    }
}
