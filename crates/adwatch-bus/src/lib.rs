//! # adwatch-bus
//!
//! Publish/subscribe transport between the fleet process and the bot process.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Envelope**: Tagged bus messages (`message_type`) decoded once per delivery
//! - **Transports**: Redis Pub/Sub for production, an in-process bus for tests
//! - **Bridge**: Correlated subscribe request/response with a bounded wait
//!
//! ## Example
//!
//! ```ignore
//! use adwatch_bus::{RedisBus, RedisBusConfig, RedisPool, RedisPoolConfig, SubscribeBridge};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let bus = Arc::new(RedisBus::new(pool, RedisBusConfig::default())?);
//!
//! let bridge = SubscribeBridge::new(bus, Duration::from_secs(60));
//! let response = bridge.request(42, vec!["https://t.me/news123".into()]).await?;
//! ```

pub mod bridge;
pub mod bus;
pub mod messages;
pub mod pool;
pub mod topics;

pub use bridge::{respond, BridgeError, BridgeResult, NewAdFeed, SubscribeBridge};
pub use bus::{
    BusError, BusResult, BusSubscription, EventBus, LocalBus, RedisBus, RedisBusConfig, SharedBus,
};
pub use messages::{BusMessage, ChannelResult, NewAdMessage, SubscribeRequest, SubscribeResponse};
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError};
pub use topics::{Topic, NEW_AD_TOPIC, RESPONSE_TOPIC_PREFIX, SUBSCRIBE_TOPIC};
