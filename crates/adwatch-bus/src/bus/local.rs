//! In-process transport.
//!
//! Payloads travel as JSON exactly as on Redis, so envelope decoding and
//! malformed-message handling behave the same in tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::{BusResult, BusSubscription, EventBus};
use crate::messages::BusMessage;
use crate::topics::Topic;

const DEFAULT_CAPACITY: usize = 256;

/// Event bus living inside one process
#[derive(Clone)]
pub struct LocalBus {
    topics: Arc<DashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Number of live subscriptions on a topic
    #[must_use]
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .get(&topic.name())
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Publish an undecoded payload
    pub fn publish_raw(&self, topic: &Topic, payload: impl Into<String>) -> u32 {
        let Some(sender) = self.topics.get(&topic.name()).map(|s| s.value().clone()) else {
            return 0;
        };
        sender
            .send(payload.into())
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl EventBus for LocalBus {
    async fn publish(&self, topic: &Topic, message: &BusMessage) -> BusResult<u32> {
        let payload = message.to_json()?;
        let receivers = self.publish_raw(topic, payload);

        tracing::debug!(
            topic = %topic,
            message_type = message.kind(),
            receivers = receivers,
            "Published bus message"
        );

        Ok(receivers)
    }

    async fn subscribe(&self, topic: &Topic) -> BusResult<BusSubscription> {
        let name = topic.name();
        let source = self
            .topics
            .entry(name.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let (tx, rx) = mpsc::channel(self.capacity);
        let cancel = CancellationToken::new();
        let topics = Arc::clone(&self.topics);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            forward(&name, source, tx, token).await;
            // Drop the topic once its last subscriber is gone
            topics.remove_if(&name, |_, sender| sender.receiver_count() == 0);
        });

        Ok(BusSubscription::new(topic.clone(), rx, cancel, task))
    }
}

async fn forward(
    topic: &str,
    mut source: broadcast::Receiver<String>,
    tx: mpsc::Sender<BusMessage>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            () = cancel.cancelled() => return,
            received = source.recv() => match received {
                Ok(payload) => payload,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(topic = %topic, lagged = n, "Bus subscriber lagged behind");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        };

        match BusMessage::from_json(&payload) {
            Ok(message) => {
                if tx.send(message).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Dropping malformed bus message");
            }
        }
    }
}
