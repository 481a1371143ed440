//! Subscribe-request listener
//!
//! Consumes the request topic and answers each request on its reply topic.
//! Requests are served concurrently; one slow join never blocks the next request.

use std::sync::Arc;

use adwatch_bus::{respond, BusError, BusMessage, EventBus, Topic};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{FleetError, FleetResult};
use crate::subscription::SubscriptionHandler;

/// Bus consumer for [`Topic::SubscribeRequests`]
pub struct RequestListener {
    bus: Arc<dyn EventBus>,
    handler: SubscriptionHandler,
}

impl RequestListener {
    pub fn new(bus: Arc<dyn EventBus>, handler: SubscriptionHandler) -> Self {
        Self { bus, handler }
    }

    /// Serve requests until `shutdown` fires.
    ///
    /// In-flight requests are dropped on shutdown; the requester times out.
    pub async fn run(self, shutdown: CancellationToken) -> FleetResult<()> {
        let mut requests = self.bus.subscribe(&Topic::SubscribeRequests).await?;
        let mut inflight = JoinSet::new();
        info!(topic = %requests.topic(), "Listening for subscribe requests");

        let outcome = loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break Ok(()),
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Subscribe request task failed");
                    }
                }
                message = requests.recv() => match message {
                    Some(BusMessage::SubscribeChannels(request)) => {
                        let bus = Arc::clone(&self.bus);
                        let handler = self.handler.clone();
                        inflight.spawn(async move {
                            let response = handler.handle_request(&request).await;
                            if let Err(e) = respond(bus.as_ref(), response).await {
                                warn!(request_id = %request.request_id, error = %e, "Failed to publish response");
                            }
                        });
                    }
                    Some(other) => debug!(kind = other.kind(), "Ignoring message on request topic"),
                    None => break Err(FleetError::Bus(BusError::Closed)),
                },
            }
        };

        inflight.shutdown().await;
        requests.close().await;
        info!("Subscribe listener stopped");
        outcome
    }
}
