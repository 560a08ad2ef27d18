//! Protocol front-ends
//!
//! Three independent periodic adapters read the shared [`Registry`] through
//! their projection map and push into a protocol port:
//!
//! - [`register`]: register tables, plus a Modbus TCP server over the bank
//! - [`object`]: commandable value objects with priority arrays
//! - [`telemetry`]: JSON messages on per-point topics (MQTT)
//!
//! Inbound writes reach the registry only through the write-handler traits
//! implemented by the register and object front-ends.
//!
//! [`Registry`]: sensim_model::Registry

pub mod error;
pub mod frontend;
pub mod object;
pub mod reconnect;
pub mod register;
pub mod telemetry;

pub use error::{FrontendError, ModbusException, ObjectError, PortError};
pub use frontend::{run_frontend, Frontend, FrontendStats};
pub use object::{
    ObjectFrontend, ObjectPort, ObjectStore, PropertyValue, WritePropertyHandler,
    WritePropertyRequest,
};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use register::{
    ModbusTcpServer, RegisterBank, RegisterFrontend, RegisterPort, RegisterWriteHandler,
};
pub use telemetry::{
    MemoryPublisher, MqttConfig, MqttPublisher, Publisher, TelemetryFrontend, TelemetrySwitch,
};
