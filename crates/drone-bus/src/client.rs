//! Bus client trait (C1) and the in-process backend.

use crate::error::{BusError, Result};
use crate::topic::matches_pattern;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

/// A single bus message: topic plus JSON payload.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Value,
}

/// A live subscription. Callers poll `recv()` in a loop, typically inside
/// a dedicated ingest worker task (§5).
pub struct BusSubscription {
    pattern: String,
    receiver: broadcast::Receiver<BusMessage>,
}

impl BusSubscription {
    pub(crate) fn new(pattern: &str, receiver: broadcast::Receiver<BusMessage>) -> Self {
        Self {
            pattern: pattern.to_string(),
            receiver,
        }
    }

    /// Await the next message whose topic matches this subscription's
    /// pattern. Returns `None` when the underlying channel is closed.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if matches_pattern(&self.pattern, &msg.topic) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(pattern = %self.pattern, skipped, "subscriber lagged, messages dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A topic-addressed publish/subscribe facade (§4.1). Implementations
/// must fail soft: publish/subscribe never abort the process, they
/// surface a typed [`BusError`] instead.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Idempotent; fail-soft on broker absence.
    async fn connect(&self) -> Result<()>;

    /// Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Lossless-intent delivery; never blocks indefinitely.
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;

    /// Delivers payloads matching `topic_pattern` (supports the MQTT-style
    /// `+` single-level wildcard) in broker order.
    async fn subscribe(&self, topic_pattern: &str) -> Result<BusSubscription>;
}

const CHANNEL_CAPACITY: usize = 4096;

/// `tokio::sync::broadcast`-backed bus for tests and the standalone
/// simulator binary. Every publish fans out to every live subscription;
/// subscriptions filter by topic pattern on receipt.
pub struct InProcessBus {
    sender: broadcast::Sender<BusMessage>,
}

impl InProcessBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusClient for InProcessBus {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        let msg = BusMessage {
            topic: topic.to_string(),
            payload,
        };
        // No subscribers is not an error: the bus never blocks callers.
        let _ = self.sender.send(msg);
        Ok(())
    }

    async fn subscribe(&self, topic_pattern: &str) -> Result<BusSubscription> {
        Ok(BusSubscription::new(topic_pattern, self.sender.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_matching_topic() {
        let bus = InProcessBus::new();
        let mut sub = bus.subscribe("satellite/alerts").await.unwrap();
        bus.publish("satellite/alerts", json!({"alert_id": "a1"}))
            .await
            .unwrap();
        let msg = sub.recv().await.expect("message delivered");
        assert_eq!(msg.topic, "satellite/alerts");
    }

    #[tokio::test]
    async fn subscriber_ignores_non_matching_topic() {
        let bus = InProcessBus::new();
        let mut sub = bus.subscribe("uav/+/telemetry").await.unwrap();
        bus.publish("detections", json!({})).await.unwrap();
        bus.publish("uav/u1/telemetry", json!({"uav_id": "u1"}))
            .await
            .unwrap();
        let msg = sub.recv().await.expect("telemetry delivered");
        assert_eq!(msg.topic, "uav/u1/telemetry");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = InProcessBus::new();
        assert!(bus.publish("satellite/alerts", json!({})).await.is_ok());
    }
}
