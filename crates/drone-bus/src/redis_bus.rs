//! Redis-backed [`BusClient`](crate::client::BusClient), grounded on
//! `drone-persistence::cache::CacheClient`'s `ConnectionManager` usage.

use crate::client::{BusClient, BusMessage, BusSubscription};
use crate::error::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, warn};

const CHANNEL_CAPACITY: usize = 4096;

/// Publishes through a pooled [`ConnectionManager`] (auto-reconnecting,
/// same client the persistence layer uses for caching); subscribes by
/// opening a dedicated PSUBSCRIBE connection per distinct pattern and
/// re-publishing onto a local broadcast channel so callers get the same
/// [`BusSubscription`] shape as [`crate::client::InProcessBus`].
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    publish_conn: ConnectionManager,
    local: broadcast::Sender<BusMessage>,
}

impl RedisBus {
    /// Opens a `ConnectionManager` against `url`. Does not yet hold any
    /// subscriptions; those are opened lazily per call to `subscribe`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let publish_conn = ConnectionManager::new(client.clone()).await?;
        let (local, _) = broadcast::channel(CHANNEL_CAPACITY);
        Ok(Self {
            client,
            publish_conn,
            local,
        })
    }

    /// Redis glob patterns use `*`, MQTT uses `+`; both mean "one segment"
    /// here because our topics never contain literal glob metacharacters.
    fn to_redis_pattern(topic_pattern: &str) -> String {
        topic_pattern.replace('+', "*")
    }
}

#[async_trait]
impl BusClient for RedisBus {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        let mut conn = self.publish_conn.clone();
        let body = serde_json::to_string(&payload)?;
        let _: i64 = conn.publish(topic, body).await?;
        Ok(())
    }

    async fn subscribe(&self, topic_pattern: &str) -> Result<BusSubscription> {
        let redis_pattern = Self::to_redis_pattern(topic_pattern);
        let client = self.client.clone();
        let local = self.local.clone();
        let receiver = self.local.subscribe();

        tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(err) => {
                    error!(%err, pattern = %redis_pattern, "failed to open redis pubsub connection");
                    return;
                }
            };
            if let Err(err) = pubsub.psubscribe(&redis_pattern).await {
                error!(%err, pattern = %redis_pattern, "psubscribe failed");
                return;
            }
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let topic: String = msg.get_channel_name().to_string();
                let raw: String = match msg.get_payload() {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!(%err, "dropping non-utf8 redis message");
                        continue;
                    }
                };
                let payload: Value = match serde_json::from_str(&raw) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(%err, %topic, "dropping malformed json payload");
                        continue;
                    }
                };
                let _ = local.send(BusMessage { topic, payload });
            }
        });

        Ok(BusSubscription::new(topic_pattern, receiver))
    }
}
