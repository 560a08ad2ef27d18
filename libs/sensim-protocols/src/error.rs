//! Error types for protocol ports and front-ends

use errors::SimError;
use sensim_routing::ObjectId;
use thiserror::Error;

/// Failure reported by a protocol port
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    #[error("{table} offset {offset} (+{len}) outside bank")]
    OutOfBounds {
        table: String,
        offset: u16,
        len: usize,
    },

    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("not connected: {0}")]
    Disconnected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure of one front-end tick
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error("publish to '{topic}' failed: {source}")]
    Publish {
        topic: String,
        #[source]
        source: PortError,
    },

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<FrontendError> for SimError {
    fn from(err: FrontendError) -> Self {
        match err {
            FrontendError::Port(PortError::Disconnected(endpoint)) => SimError::ConnectionFailed {
                endpoint,
                reason: "not connected".to_string(),
            },
            other => SimError::Protocol {
                protocol: "frontend".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Exception codes returned to register clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModbusException {
    #[error("illegal function")]
    IllegalFunction,

    #[error("illegal data address")]
    IllegalDataAddress,

    #[error("illegal data value")]
    IllegalDataValue,

    #[error("server device failure")]
    ServerDeviceFailure,
}

impl ModbusException {
    pub fn code(&self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
        }
    }
}

/// Rejection of an inbound write-property
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("unknown-object: {0}")]
    UnknownObject(ObjectId),

    #[error("write-access-denied: {0}")]
    WriteAccessDenied(String),

    #[error("value-out-of-range: {0}")]
    ValueOutOfRange(String),
}

impl ObjectError {
    /// Error code name as used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownObject(_) => "unknown-object",
            Self::WriteAccessDenied(_) => "write-access-denied",
            Self::ValueOutOfRange(_) => "value-out-of-range",
        }
    }
}

impl From<ObjectError> for SimError {
    fn from(err: ObjectError) -> Self {
        SimError::Protocol {
            protocol: "object".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensim_routing::ObjectType;

    #[test]
    fn test_exception_codes() {
        assert_eq!(ModbusException::IllegalFunction.code(), 1);
        assert_eq!(ModbusException::IllegalDataAddress.code(), 2);
        assert_eq!(ModbusException::IllegalDataValue.code(), 3);
    }

    #[test]
    fn test_object_error_display() {
        let err = ObjectError::UnknownObject(ObjectId::new(ObjectType::AnalogValue, 9));
        assert_eq!(err.to_string(), "unknown-object: AV:9");
        assert_eq!(err.code(), "unknown-object");
    }

    #[test]
    fn test_disconnect_maps_to_connection_failed() {
        let err: SimError = FrontendError::Port(PortError::Disconnected("mqtt".into())).into();
        assert!(matches!(err, SimError::ConnectionFailed { .. }));
    }
}
