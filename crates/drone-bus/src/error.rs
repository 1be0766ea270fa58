//! Bus layer error types.

use thiserror::Error;

/// Errors raised by bus operations. Per spec §4.1, these are always
/// recoverable from the caller's point of view: publish/subscribe never
/// abort the process, they surface a typed warning instead.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus is disconnected")]
    Disconnected,

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for BusError {
    fn from(err: redis::RedisError) -> Self {
        Self::PublishFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BusError>;
