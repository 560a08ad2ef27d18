use async_trait::async_trait;
use std::sync::Arc;

use sensim_model::{Registry, TimeProvider};
use sensim_routing::TopicMap;

use super::{Publisher, TelemetryPayload, TelemetrySwitch};
use crate::error::FrontendError;
use crate::frontend::Frontend;

/// Publishes every mapped point once per tick while the switch is on
pub struct TelemetryFrontend {
    registry: Arc<Registry>,
    topics: Arc<TopicMap>,
    publisher: Arc<dyn Publisher>,
    switch: Arc<TelemetrySwitch>,
    time: Arc<dyn TimeProvider>,
}

impl TelemetryFrontend {
    pub fn new(
        registry: Arc<Registry>,
        topics: Arc<TopicMap>,
        publisher: Arc<dyn Publisher>,
        switch: Arc<TelemetrySwitch>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            registry,
            topics,
            publisher,
            switch,
            time,
        }
    }
}

#[async_trait]
impl Frontend for TelemetryFrontend {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn tick(&self) -> Result<usize, FrontendError> {
        if !self.switch.is_enabled() {
            return Ok(0);
        }

        let timestamp = self.time.now_millis().div_euclid(1000);
        // Encode everything first; no registry lock is held while publishing
        let snapshot = self.registry.snapshot();
        let mut messages = Vec::with_capacity(self.topics.len());
        for (point, topic) in self.topics.iter() {
            if let Some(value) = snapshot.get(point) {
                let payload = serde_json::to_vec(&TelemetryPayload::new(*value, timestamp))?;
                messages.push((topic, payload));
            }
        }

        let count = messages.len();
        for (topic, payload) in messages {
            self.publisher
                .publish(topic, payload)
                .await
                .map_err(|source| FrontendError::Publish {
                    topic: topic.to_string(),
                    source,
                })?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::PortError;
    use crate::telemetry::MemoryPublisher;
    use sensim_model::{FixedTimeProvider, PointDefinition};

    const T0: i64 = 1_700_000_000_500;

    fn fixture(publisher: Arc<dyn Publisher>) -> (Arc<TelemetrySwitch>, TelemetryFrontend) {
        let defs = vec![
            PointDefinition::analog("temp", "C", 21.456, 0.0, 100.0).with_noise(0.0),
            PointDefinition::analog("unpublished", "C", 1.0, 0.0, 2.0),
        ];
        let registry = Arc::new(Registry::from_definitions(&defs, T0, 1));
        let mut topics = TopicMap::default();
        topics.insert("temp", "campus/building_1/temp");
        let switch = Arc::new(TelemetrySwitch::default());
        let frontend = TelemetryFrontend::new(
            registry,
            Arc::new(topics),
            publisher,
            switch.clone(),
            Arc::new(FixedTimeProvider::new(T0)),
        );
        (switch, frontend)
    }

    #[tokio::test]
    async fn test_publishes_rounded_payload() {
        let publisher = Arc::new(MemoryPublisher::new());
        let (_, frontend) = fixture(publisher.clone());

        assert_eq!(frontend.tick().await.unwrap(), 1);
        let messages = publisher.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "campus/building_1/temp");
        let payload: TelemetryPayload = serde_json::from_slice(&messages[0].payload).unwrap();
        assert_eq!(payload, TelemetryPayload { value: 21.46, timestamp: 1_700_000_000 });
    }

    #[tokio::test]
    async fn test_disabled_switch_skips_publishing() {
        let publisher = Arc::new(MemoryPublisher::new());
        let (switch, frontend) = fixture(publisher.clone());

        switch.set(false);
        assert_eq!(frontend.tick().await.unwrap(), 0);
        assert!(publisher.messages().is_empty());

        switch.set(true);
        assert_eq!(frontend.tick().await.unwrap(), 1);
    }

    struct Down;

    #[async_trait]
    impl Publisher for Down {
        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), PortError> {
            Err(PortError::Disconnected("broker".into()))
        }
    }

    #[tokio::test]
    async fn test_publish_failure_aborts_tick() {
        let (_, frontend) = fixture(Arc::new(Down));
        let err = frontend.tick().await.unwrap_err();
        assert!(matches!(err, FrontendError::Publish { .. }));
    }
}
