//! Redis Pub/Sub transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{AsyncCommands, Client};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{BusError, BusResult, BusSubscription, EventBus};
use crate::messages::BusMessage;
use crate::pool::{redact, RedisPool};
use crate::topics::Topic;

/// Redis transport configuration
#[derive(Debug, Clone)]
pub struct RedisBusConfig {
    /// Redis URL used for dedicated Pub/Sub connections
    pub redis_url: String,
    /// Per-subscription buffer of decoded messages
    pub buffer: usize,
    /// Delay before re-subscribing after a lost connection
    pub reconnect_delay: Duration,
}

impl Default for RedisBusConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            buffer: 256,
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&adwatch_common::RedisConfig> for RedisBusConfig {
    fn from(config: &adwatch_common::RedisConfig) -> Self {
        Self {
            redis_url: config.url.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            ..Self::default()
        }
    }
}

/// Event bus over Redis Pub/Sub
#[derive(Clone)]
pub struct RedisBus {
    pool: RedisPool,
    client: Client,
    config: RedisBusConfig,
}

impl RedisBus {
    /// Create a new Redis bus publishing through `pool`
    pub fn new(pool: RedisPool, config: RedisBusConfig) -> BusResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        tracing::info!(url = %redact(&config.redis_url), "Redis bus ready");
        Ok(Self {
            pool,
            client,
            config,
        })
    }

    /// Check that Redis answers
    pub async fn health_check(&self) -> BusResult<()> {
        Ok(self.pool.health_check().await?)
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, topic: &Topic, message: &BusMessage) -> BusResult<u32> {
        let mut conn = self.pool.get().await?;
        let name = topic.name();
        let payload = message.to_json()?;

        let receivers: u32 = conn.publish(&name, &payload).await?;

        tracing::debug!(
            topic = %name,
            message_type = message.kind(),
            receivers = receivers,
            "Published bus message"
        );

        Ok(receivers)
    }

    async fn subscribe(&self, topic: &Topic) -> BusResult<BusSubscription> {
        let (tx, rx) = mpsc::channel(self.config.buffer);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(listener_loop(
            self.client.clone(),
            topic.name(),
            self.config.reconnect_delay,
            tx,
            cancel.clone(),
            ready_tx,
        ));

        match ready_rx.await {
            Ok(Ok(())) => Ok(BusSubscription::new(topic.clone(), rx, cancel, task)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BusError::Closed),
        }
    }
}

/// Keep one topic subscribed until cancelled, reconnecting on failure
async fn listener_loop(
    client: Client,
    topic: String,
    reconnect_delay: Duration,
    tx: mpsc::Sender<BusMessage>,
    cancel: CancellationToken,
    ready: oneshot::Sender<BusResult<()>>,
) {
    let mut ready = Some(ready);

    loop {
        match run_listener(&client, &topic, &tx, &cancel, &mut ready).await {
            Ok(()) => break,
            Err(e) => {
                // The first connection failure goes back to the subscriber
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(e));
                    return;
                }
                tracing::error!(topic = %topic, error = %e, "Bus listener error, reconnecting...");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(reconnect_delay) => {}
                }
            }
        }
    }

    tracing::debug!(topic = %topic, "Bus listener stopped");
}

/// Run the listener until cancellation (`Ok`) or a lost connection (`Err`)
async fn run_listener(
    client: &Client,
    topic: &str,
    tx: &mpsc::Sender<BusMessage>,
    cancel: &CancellationToken,
    ready: &mut Option<oneshot::Sender<BusResult<()>>>,
) -> BusResult<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(topic).await?;

    if let Some(ready) = ready.take() {
        let _ = ready.send(Ok(()));
    }
    tracing::debug!(topic = %topic, "Subscribed to topic");

    let lost = {
        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break false,
                msg = stream.next() => {
                    let Some(msg) = msg else { break true };
                    let payload: String = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!(topic = %topic, error = %e, "Dropping non-text bus payload");
                            continue;
                        }
                    };
                    match BusMessage::from_json(&payload) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                // Subscription handle is gone
                                break false;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(topic = %topic, error = %e, "Dropping malformed bus message");
                        }
                    }
                }
            }
        }
    };

    if lost {
        tracing::warn!(topic = %topic, "Pub/Sub stream ended");
        return Err(BusError::Closed);
    }

    if let Err(e) = pubsub.unsubscribe(topic).await {
        tracing::debug!(topic = %topic, error = %e, "Unsubscribe failed");
    }
    Ok(())
}
