//! Per-session tasks: the supervisor driving the client and the heartbeat

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use adwatch_core::traits::SessionRepository;
use adwatch_core::{ClientError, ClientResult, IncomingMessage, UserClient};
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::registry::Activity;
use super::FleetEvent;
use crate::ingest::MessageIngestor;

const INBOX_CAPACITY: usize = 256;

/// Drive `client` until it disconnects or `cancel` fires.
///
/// Messages are ingested one at a time in arrival order. Unless cancelled, the
/// exit is always reported, panics included.
pub(super) async fn supervise(
    session_id: i64,
    generation: u64,
    client: Arc<dyn UserClient>,
    ingestor: MessageIngestor,
    activity: Arc<Activity>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<FleetEvent>,
) {
    let run = AssertUnwindSafe(drive(session_id, client, ingestor, activity, cancel))
        .catch_unwind()
        .await;

    let result = match run {
        Ok(Some(result)) => result,
        Ok(None) => return,
        Err(_) => Err(ClientError::transient("session supervisor panicked")),
    };

    // The core only stops listening during shutdown
    let _ = events.send(FleetEvent::Exited {
        session_id,
        generation,
        result,
    });
}

async fn drive(
    session_id: i64,
    client: Arc<dyn UserClient>,
    ingestor: MessageIngestor,
    activity: Arc<Activity>,
    cancel: CancellationToken,
) -> Option<ClientResult<()>> {
    let (tx, mut inbox) = mpsc::channel::<IncomingMessage>(INBOX_CAPACITY);
    let run = client.run(tx);
    tokio::pin!(run);

    tracing::info!(session_id, "Session running");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            Some(message) = inbox.recv() => {
                activity.touch();
                ingestor.handle(session_id, &message).await;
            }
            result = &mut run => {
                match &result {
                    Ok(()) => tracing::warn!(session_id, "Session disconnected"),
                    Err(e) => tracing::warn!(session_id, error = %e, "Session stopped with error"),
                }
                return Some(result);
            }
        }
    }
}

/// Ping the session every `period`, reconnecting first when the link is down
pub(super) async fn heartbeat(
    session_id: i64,
    client: Arc<dyn UserClient>,
    sessions: Arc<dyn SessionRepository>,
    activity: Arc<Activity>,
    period: Duration,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<FleetEvent>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        // Network calls can hang on a silent link; never outlive cancellation
        if !client.is_connected() {
            tracing::info!(session_id, "Heartbeat found session disconnected, reconnecting");
            let reconnected = tokio::select! {
                () = cancel.cancelled() => return,
                result = client.reconnect() => result,
            };
            if let Err(e) = reconnected {
                if report_if_banned(session_id, &e, &events) {
                    return;
                }
                tracing::warn!(session_id, error = %e, "Reconnect failed");
                continue;
            }
        }

        let pinged = tokio::select! {
            () = cancel.cancelled() => return,
            result = client.me() => result,
        };
        match pinged {
            Ok(account) => {
                activity.touch();
                tracing::debug!(session_id, user_id = account.user_id, "Heartbeat ok");
                if let Err(e) = sessions.touch_activity(session_id, Utc::now()).await {
                    tracing::warn!(session_id, error = %e, "Failed to record activity");
                }
            }
            Err(e) => {
                if report_if_banned(session_id, &e, &events) {
                    return;
                }
                tracing::warn!(session_id, error = %e, "Heartbeat failed");
            }
        }
    }
}

fn report_if_banned(
    session_id: i64,
    error: &ClientError,
    events: &mpsc::UnboundedSender<FleetEvent>,
) -> bool {
    let ClientError::Banned(rpc) = error else {
        return false;
    };
    let _ = events.send(FleetEvent::Banned {
        session_id,
        reason: format!("banned: {rpc}"),
    });
    true
}
