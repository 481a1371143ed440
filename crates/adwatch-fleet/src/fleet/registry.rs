//! Live client registry
//!
//! Owned by the fleet core. Other components only borrow clients through
//! `get_client` and `is_live`; slots are added and removed inside `fleet`.

use std::sync::Arc;
use std::time::Duration;

use adwatch_core::UserClient;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Last observed sign of life for one session
#[derive(Debug)]
pub(crate) struct Activity {
    last_seen: Mutex<Instant>,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub(crate) fn idle(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// Running session: client plus its supervising and heartbeat tasks
pub(super) struct SessionSlot {
    pub(super) client: Arc<dyn UserClient>,
    pub(super) generation: u64,
    pub(super) activity: Arc<Activity>,
    pub(super) started_at: Instant,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl SessionSlot {
    pub(super) fn new(
        client: Arc<dyn UserClient>,
        generation: u64,
        activity: Arc<Activity>,
        cancel: CancellationToken,
        supervisor: JoinHandle<()>,
        heartbeat: JoinHandle<()>,
    ) -> Self {
        Self {
            client,
            generation,
            activity,
            started_at: Instant::now(),
            cancel,
            supervisor,
            heartbeat,
        }
    }

    pub(super) fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Cancel both tasks, wait for them, then disconnect the client.
    ///
    /// Every wait is bounded by `grace`; a task still running after it is aborted.
    pub(super) async fn stop(self, session_id: i64, grace: Duration) {
        self.cancel.cancel();
        for (task, mut handle) in [("supervisor", self.supervisor), ("heartbeat", self.heartbeat)] {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Err(e)) if e.is_panic() => tracing::error!(session_id, task, "Session task panicked"),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(session_id, task, "Session task ignored cancellation, aborting");
                    handle.abort();
                }
            }
        }
        if tokio::time::timeout(grace, self.client.disconnect()).await.is_err() {
            tracing::warn!(session_id, "Client disconnect timed out");
        }
        tracing::debug!(session_id, generation = self.generation, "Session stopped");
    }
}

/// Point-in-time view of one slot for the health monitor
#[derive(Debug, Clone, Copy)]
pub(super) struct SlotHealth {
    pub(super) session_id: i64,
    pub(super) finished: bool,
    pub(super) connected: bool,
    pub(super) idle: Duration,
    pub(super) uptime: Duration,
}

/// Live clients keyed by session id
#[derive(Default)]
pub struct ClientRegistry {
    slots: DashMap<i64, SessionSlot>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the client of a running session
    pub fn get_client(&self, session_id: i64) -> Option<Arc<dyn UserClient>> {
        self.slots
            .get(&session_id)
            .map(|slot| Arc::clone(&slot.client))
    }

    /// Whether the session has a running supervising task
    pub fn is_live(&self, session_id: i64) -> bool {
        self.slots
            .get(&session_id)
            .is_some_and(|slot| !slot.is_finished())
    }

    /// Ids of every tracked session
    pub fn session_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.slots.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(super) fn generation(&self, session_id: i64) -> Option<u64> {
        self.slots.get(&session_id).map(|slot| slot.generation)
    }

    pub(super) fn insert(&self, session_id: i64, slot: SessionSlot) -> Option<SessionSlot> {
        self.slots.insert(session_id, slot)
    }

    pub(super) fn remove(&self, session_id: i64) -> Option<SessionSlot> {
        self.slots.remove(&session_id).map(|(_, slot)| slot)
    }

    pub(super) fn drain(&self) -> Vec<(i64, SessionSlot)> {
        let ids = self.session_ids();
        ids.into_iter()
            .filter_map(|id| self.remove(id).map(|slot| (id, slot)))
            .collect()
    }

    pub(super) fn health(&self) -> Vec<SlotHealth> {
        self.slots
            .iter()
            .map(|entry| SlotHealth {
                session_id: *entry.key(),
                finished: entry.is_finished(),
                connected: entry.client.is_connected(),
                idle: entry.activity.idle(),
                uptime: entry.started_at.elapsed(),
            })
            .collect()
    }

    pub(super) fn idle(&self, session_id: i64) -> Option<Duration> {
        self.slots.get(&session_id).map(|slot| slot.activity.idle())
    }
}
