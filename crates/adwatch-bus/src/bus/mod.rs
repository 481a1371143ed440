//! Event bus transports.
//!
//! `EventBus` is the seam both processes talk through; `RedisBus` carries it over
//! Redis Pub/Sub and `LocalBus` keeps it in-process.

mod local;
mod redis_bus;
mod subscription;

use std::sync::Arc;

use async_trait::async_trait;

use crate::messages::BusMessage;
use crate::pool::RedisPoolError;
use crate::topics::Topic;

pub use self::local::LocalBus;
pub use self::redis_bus::{RedisBus, RedisBusConfig};
pub use self::subscription::BusSubscription;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] RedisPoolError),

    #[error("Failed to encode bus message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscription closed")]
    Closed,
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Publish/subscribe over named topics
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message; returns how many subscribers received it
    async fn publish(&self, topic: &Topic, message: &BusMessage) -> BusResult<u32>;

    /// Subscribe to a topic; the subscription is live when this returns
    async fn subscribe(&self, topic: &Topic) -> BusResult<BusSubscription>;
}

/// Shared bus handle
pub type SharedBus = Arc<dyn EventBus>;
