//! Request/response bridge and bot-side helpers.
//!
//! The requester subscribes to the per-request reply topic *before* publishing,
//! so a fast responder cannot answer into an empty topic.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::{BusError, BusResult, BusSubscription, EventBus};
use crate::messages::{BusMessage, NewAdMessage, SubscribeRequest, SubscribeResponse};
use crate::topics::Topic;

/// Error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("No response for request {request_id} within the wait bound")]
    Timeout { request_id: String },

    #[error("Reply subscription for request {request_id} closed")]
    Closed { request_id: String },
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bot-side requester for subscribe operations
#[derive(Clone)]
pub struct SubscribeBridge {
    bus: Arc<dyn EventBus>,
    timeout: Duration,
}

impl SubscribeBridge {
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the fleet to join `links` on behalf of `user_id`
    pub async fn request(
        &self,
        user_id: i64,
        links: Vec<String>,
    ) -> BridgeResult<SubscribeResponse> {
        self.send(SubscribeRequest::new(user_id, links)).await
    }

    /// Send a prepared request and wait for its correlated response
    pub async fn send(&self, request: SubscribeRequest) -> BridgeResult<SubscribeResponse> {
        let request_id = request.request_id.clone();
        let mut reply = self.bus.subscribe(&Topic::response(&request_id)).await?;

        let outcome = self.exchange(&mut reply, request).await;
        reply.close().await;

        match &outcome {
            Ok(response) => tracing::info!(
                request_id = %request_id,
                success = response.success,
                joined = response.succeeded().count(),
                "Subscribe request answered"
            ),
            Err(e) => tracing::warn!(request_id = %request_id, error = %e, "Subscribe request failed"),
        }
        outcome
    }

    async fn exchange(
        &self,
        reply: &mut BusSubscription,
        request: SubscribeRequest,
    ) -> BridgeResult<SubscribeResponse> {
        let request_id = request.request_id.clone();
        let receivers = self
            .bus
            .publish(&Topic::SubscribeRequests, &BusMessage::SubscribeChannels(request))
            .await?;
        if receivers == 0 {
            tracing::warn!(request_id = %request_id, "No fleet is listening for subscribe requests");
        }

        let wait = async {
            while let Some(message) = reply.recv().await {
                match message {
                    BusMessage::SubscribeResponse(response) if response.request_id == request_id => {
                        return Some(response);
                    }
                    other => tracing::debug!(
                        request_id = %request_id,
                        message_type = other.kind(),
                        "Ignoring unrelated message on reply topic"
                    ),
                }
            }
            None
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(BridgeError::Closed { request_id }),
            Err(_) => Err(BridgeError::Timeout { request_id }),
        }
    }
}

/// Publish the single response to a request on its reply topic
pub async fn respond(bus: &dyn EventBus, response: SubscribeResponse) -> BusResult<u32> {
    let topic = Topic::response(response.request_id.as_str());
    bus.publish(&topic, &BusMessage::SubscribeResponse(response))
        .await
}

/// Bot-side stream of new-ad notifications
pub struct NewAdFeed {
    subscription: BusSubscription,
}

impl NewAdFeed {
    pub async fn open(bus: &dyn EventBus) -> BusResult<Self> {
        let subscription = bus.subscribe(&Topic::NewAd).await?;
        tracing::info!(topic = %Topic::NewAd, "Listening for new-ad notifications");
        Ok(Self { subscription })
    }

    /// Next notification; other message kinds on the topic are skipped
    pub async fn next(&mut self) -> Option<NewAdMessage> {
        loop {
            match self.subscription.recv().await? {
                BusMessage::NewAdMessage(ad) => return Some(ad),
                other => tracing::debug!(message_type = other.kind(), "Skipping non-ad message"),
            }
        }
    }

    pub async fn close(self) {
        self.subscription.close().await;
    }
}
