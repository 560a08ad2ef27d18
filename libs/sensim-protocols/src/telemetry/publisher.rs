use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::PortError;

/// Publish port
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PortError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publisher that keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().clone()
    }

    /// Drain everything published so far
    pub fn take(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PortError> {
        self.messages.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}
