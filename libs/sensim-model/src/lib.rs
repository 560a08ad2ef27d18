//! Point simulation model
//!
//! Points with waveform generators, fault injection and a 16-level command
//! priority array, held in a shared [`Registry`] and advanced by a
//! [`SimulationClock`].

pub mod clock;
pub mod config;
pub mod error;
pub mod fault;
pub mod point;
pub mod priority;
pub mod registry;
pub mod time;
pub mod waveform;

pub use clock::{SimulationClock, DEFAULT_TICK};
pub use config::{
    default_points, load_point_set, load_point_set_or_default, AlarmModel, PointDefinition,
    PointKind, PointSetFile,
};
pub use error::{CommandError, ConfigError, UnknownFaultKind, UnknownSimulationType};
pub use fault::{Fault, FaultKind};
pub use point::{Point, PointView};
pub use priority::{PriorityArray, PriorityLevel, DEFAULT_WRITE_PRIORITY, PRIORITY_LEVELS};
pub use registry::{PointHandle, Registry};
pub use time::{FixedTimeProvider, ManualTimeProvider, SystemTimeProvider, TimeProvider};
pub use waveform::{SimulationType, WaveParams};
