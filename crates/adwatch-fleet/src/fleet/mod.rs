//! Fleet core
//!
//! Owns the live-client registry and every session's tasks. All lifecycle
//! changes go through one control loop fed by [`FleetEvent`]s, so restarts,
//! ban handling and operator commands never race each other.

mod registry;
mod session_task;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use adwatch_core::entities::{SessionStatus, UserbotSession};
use adwatch_core::{ClientError, ClientFactory, ClientResult, UserClient};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use registry::ClientRegistry;

/// Bound on each wait while tearing a session down
const STOP_GRACE: Duration = Duration::from_secs(10);
/// Bound on connecting a client; the control loop waits for it
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
use registry::{Activity, SessionSlot};

use crate::balancer::LoadBalancer;
use crate::context::FleetContext;
use crate::error::{FleetError, FleetResult};
use crate::ingest::MessageIngestor;
use crate::migration::MigrationHandler;

/// Messages handled by the control loop
#[derive(Debug)]
pub(crate) enum FleetEvent {
    /// A supervising task ended
    Exited {
        session_id: i64,
        generation: u64,
        result: ClientResult<()>,
    },
    /// A ban was observed outside the supervising task
    Banned { session_id: i64, reason: String },
    /// A delayed restart is due
    RestartDue { session_id: i64 },
    Add { session_id: i64 },
    Remove {
        session_id: i64,
        done: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<Vec<SessionReport>>,
    },
}

/// Operator view of one tracked session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: i64,
    pub live: bool,
    pub idle_secs: u64,
    pub restart_attempts: u32,
    pub restart_pending: bool,
}

/// Cloneable access to a running fleet core
#[derive(Clone)]
pub struct FleetHandle {
    events: mpsc::UnboundedSender<FleetEvent>,
    registry: Arc<ClientRegistry>,
}

impl FleetHandle {
    /// Borrow the client of a running session
    pub fn client(&self, session_id: i64) -> Option<Arc<dyn UserClient>> {
        self.registry.get_client(session_id)
    }

    pub fn is_live(&self, session_id: i64) -> bool {
        self.registry.is_live(session_id)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Route a ban seen by another component into the ban path
    pub fn report_ban(&self, session_id: i64, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(session_id, reason = %reason, "Ban reported");
        if self
            .events
            .send(FleetEvent::Banned { session_id, reason })
            .is_err()
        {
            warn!(session_id, "Fleet core stopped, ban report dropped");
        }
    }

    /// Start one session
    pub fn add_session(&self, session_id: i64) -> FleetResult<()> {
        self.events
            .send(FleetEvent::Add { session_id })
            .map_err(|_| FleetError::Stopped)
    }

    /// Stop one session; returns whether it was running
    pub async fn remove_session(&self, session_id: i64) -> FleetResult<bool> {
        let (done, wait) = oneshot::channel();
        self.events
            .send(FleetEvent::Remove { session_id, done })
            .map_err(|_| FleetError::Stopped)?;
        wait.await.map_err(|_| FleetError::Stopped)
    }

    /// Snapshot of every tracked session
    pub async fn status(&self) -> FleetResult<Vec<SessionReport>> {
        let (reply, wait) = oneshot::channel();
        self.events
            .send(FleetEvent::Status { reply })
            .map_err(|_| FleetError::Stopped)?;
        wait.await.map_err(|_| FleetError::Stopped)
    }
}

/// Session lifecycle manager
pub struct FleetCore {
    ctx: FleetContext,
    factory: Arc<dyn ClientFactory>,
    registry: Arc<ClientRegistry>,
    ingestor: MessageIngestor,
    migration: MigrationHandler,
    events_tx: mpsc::UnboundedSender<FleetEvent>,
    events_rx: mpsc::UnboundedReceiver<FleetEvent>,
    /// Cancelled on shutdown; every session token is a child
    root: CancellationToken,
    next_generation: u64,
    restart_attempts: HashMap<i64, u32>,
    pending_restarts: HashMap<i64, JoinHandle<()>>,
    banned: HashSet<i64>,
    migrations: JoinSet<()>,
}

impl FleetCore {
    pub fn new(ctx: FleetContext, factory: Arc<dyn ClientFactory>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(ClientRegistry::new());
        let handle = FleetHandle {
            events: events_tx.clone(),
            registry: Arc::clone(&registry),
        };
        let balancer = LoadBalancer::new(ctx.sessions_arc());

        Self {
            ingestor: MessageIngestor::new(ctx.clone()),
            migration: MigrationHandler::new(ctx.clone(), balancer, handle),
            ctx,
            factory,
            registry,
            events_tx,
            events_rx,
            root: CancellationToken::new(),
            next_generation: 0,
            restart_attempts: HashMap::new(),
            pending_restarts: HashMap::new(),
            banned: HashSet::new(),
            migrations: JoinSet::new(),
        }
    }

    pub fn handle(&self) -> FleetHandle {
        FleetHandle {
            events: self.events_tx.clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Start every eligible session, then supervise until `shutdown` fires.
    ///
    /// Only a failure to load the session list is fatal.
    pub async fn run(mut self, shutdown: CancellationToken) -> FleetResult<()> {
        self.start_all().await?;

        let period = self.ctx.config().health_check_interval();
        let mut health = interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                _ = health.tick() => self.check_health().await,
                Some(joined) = self.migrations.join_next(), if !self.migrations.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Migration task failed");
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn start_all(&mut self) -> FleetResult<()> {
        let sessions = self.ctx.sessions().find_eligible().await?;
        let minimum = self.ctx.config().min_active_sessions;
        if sessions.len() < minimum {
            warn!(
                eligible = sessions.len(),
                minimum,
                "Fewer eligible sessions than required"
            );
        }
        info!(sessions = sessions.len(), "Starting fleet");

        for session in sessions {
            self.start_loaded(session).await;
        }
        info!(running = self.registry.len(), "Fleet started");
        Ok(())
    }

    async fn handle_event(&mut self, event: FleetEvent) {
        match event {
            FleetEvent::Exited {
                session_id,
                generation,
                result,
            } => self.on_exit(session_id, generation, result).await,
            FleetEvent::Banned { session_id, reason } => self.on_ban(session_id, reason).await,
            FleetEvent::RestartDue { session_id } => {
                self.pending_restarts.remove(&session_id);
                info!(session_id, "Delayed restart due");
                self.start_session(session_id).await;
            }
            FleetEvent::Add { session_id } => {
                self.banned.remove(&session_id);
                self.restart_attempts.remove(&session_id);
                self.cancel_pending_restart(session_id);
                self.start_session(session_id).await;
            }
            FleetEvent::Remove { session_id, done } => {
                self.cancel_pending_restart(session_id);
                self.restart_attempts.remove(&session_id);
                let stopped = match self.registry.remove(session_id) {
                    Some(slot) => {
                        slot.stop(session_id, STOP_GRACE).await;
                        true
                    }
                    None => false,
                };
                info!(session_id, stopped, "Session removed");
                let _ = done.send(stopped);
            }
            FleetEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn on_exit(&mut self, session_id: i64, generation: u64, result: ClientResult<()>) {
        if self.registry.generation(session_id) != Some(generation) {
            debug!(session_id, generation, "Ignoring exit of superseded task");
            return;
        }
        if let Some(slot) = self.registry.remove(session_id) {
            slot.stop(session_id, STOP_GRACE).await;
        }

        match result {
            Ok(()) => {
                info!(session_id, "Restarting disconnected session");
                self.start_session(session_id).await;
            }
            Err(ClientError::Banned(rpc)) => self.on_ban(session_id, format!("banned: {rpc}")).await,
            Err(ClientError::NotAuthorized) => self.mark_unauthorized(session_id).await,
            Err(e) => self.on_error(session_id, e.to_string()).await,
        }
    }

    /// Retire the session and hand its channels to the migration handler, once
    async fn on_ban(&mut self, session_id: i64, reason: String) {
        if !self.banned.insert(session_id) {
            debug!(session_id, "Ban already handled");
            return;
        }
        error!(session_id, reason = %reason, "Session banned");

        self.cancel_pending_restart(session_id);
        self.restart_attempts.remove(&session_id);
        if let Some(slot) = self.registry.remove(session_id) {
            slot.stop(session_id, STOP_GRACE).await;
        }
        if let Err(e) = self.ctx.sessions().deactivate(session_id, &reason).await {
            error!(session_id, error = %e, "Failed to deactivate banned session");
        }

        let migration = self.migration.clone();
        self.migrations.spawn(async move {
            match migration.migrate(session_id, &reason).await {
                Ok(report) if report.aborted => {
                    warn!(session_id, "Migration aborted without a replacement");
                }
                Ok(_) => {}
                Err(e) => error!(session_id, error = %e, "Migration failed"),
            }
        });
    }

    /// Record the error and schedule a delayed restart with backoff
    async fn on_error(&mut self, session_id: i64, message: String) {
        if let Err(e) = self
            .ctx
            .sessions()
            .update_status(session_id, SessionStatus::Error, Some(&message))
            .await
        {
            warn!(session_id, error = %e, "Failed to record session error");
        }

        let attempts = self.restart_attempts.entry(session_id).or_insert(0);
        *attempts += 1;
        let attempt = *attempts;

        let config = self.ctx.config();
        if !config.allows_restart(attempt) {
            error!(session_id, attempts = attempt - 1, "Restart limit reached, session left in error");
            return;
        }

        let delay = config.restart_backoff(attempt);
        warn!(session_id, attempt, delay_secs = delay.as_secs(), error = %message, "Scheduling restart");
        self.schedule_restart(session_id, delay);
    }

    async fn mark_unauthorized(&self, session_id: i64) {
        warn!(session_id, "Session is not authorized, operator action required");
        if let Err(e) = self
            .ctx
            .sessions()
            .update_status(session_id, SessionStatus::Authorizing, Some("not authorized"))
            .await
        {
            warn!(session_id, error = %e, "Failed to record authorization state");
        }
    }

    fn schedule_restart(&mut self, session_id: i64, delay: Duration) {
        self.cancel_pending_restart(session_id);
        let events = self.events_tx.clone();
        let cancel = self.root.child_token();
        let task = tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = events.send(FleetEvent::RestartDue { session_id });
                }
            }
        });
        self.pending_restarts.insert(session_id, task);
    }

    fn cancel_pending_restart(&mut self, session_id: i64) {
        if let Some(task) = self.pending_restarts.remove(&session_id) {
            task.abort();
        }
    }

    /// Load one session from the store and start it
    async fn start_session(&mut self, session_id: i64) {
        match self.ctx.sessions().find_by_id(session_id).await {
            Ok(Some(session)) if session.is_active => self.start_loaded(session).await,
            Ok(Some(_)) => info!(session_id, "Session is deactivated, not starting"),
            Ok(None) => warn!(session_id, "Session not found"),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to load session");
                self.on_error(session_id, e.to_string()).await;
            }
        }
    }

    /// Connect a client and spawn the session's tasks.
    ///
    /// A session already in the registry is stopped first, so there is never more
    /// than one supervising task per session.
    async fn start_loaded(&mut self, session: UserbotSession) {
        let session_id = session.id;
        if let Some(old) = self.registry.remove(session_id) {
            old.stop(session_id, STOP_GRACE).await;
        }

        let created = tokio::time::timeout(CONNECT_TIMEOUT, self.factory.create(&session)).await;
        let created = created.unwrap_or_else(|_| {
            Err(ClientError::transient(format!(
                "connect timed out after {}s",
                CONNECT_TIMEOUT.as_secs()
            )))
        });
        let client = match created {
            Ok(client) => client,
            Err(ClientError::Banned(rpc)) => {
                self.on_ban(session_id, format!("banned: {rpc}")).await;
                return;
            }
            Err(ClientError::NotAuthorized) => {
                self.mark_unauthorized(session_id).await;
                return;
            }
            Err(e) => {
                warn!(session_id, error = %e, "Failed to connect session");
                self.on_error(session_id, e.to_string()).await;
                return;
            }
        };

        if session.status != SessionStatus::Active || session.last_error.is_some() {
            if let Err(e) = self
                .ctx
                .sessions()
                .update_status(session_id, SessionStatus::Active, None)
                .await
            {
                warn!(session_id, error = %e, "Failed to mark session active");
            }
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = self.root.child_token();
        let activity = Arc::new(Activity::new());

        let supervisor = tokio::spawn(session_task::supervise(
            session_id,
            generation,
            Arc::clone(&client),
            self.ingestor.clone(),
            Arc::clone(&activity),
            cancel.clone(),
            self.events_tx.clone(),
        ));
        let heartbeat = tokio::spawn(session_task::heartbeat(
            session_id,
            Arc::clone(&client),
            self.ctx.sessions_arc(),
            Arc::clone(&activity),
            self.ctx.config().heartbeat_interval(),
            cancel.clone(),
            self.events_tx.clone(),
        ));

        self.registry.insert(
            session_id,
            SessionSlot::new(client, generation, activity, cancel, supervisor, heartbeat),
        );
        info!(session_id, name = %session.display_name(), generation, "Session started");
    }

    /// Restart sessions that disconnected or went silent; reset healthy counters
    async fn check_health(&mut self) {
        let config = self.ctx.config().clone();

        for slot in self.registry.health() {
            let session_id = slot.session_id;
            if slot.finished {
                // The exit event is already queued
                continue;
            }
            if !slot.connected {
                warn!(session_id, "Session not connected, restarting");
                self.start_session(session_id).await;
            } else if slot.idle > config.inactivity_timeout() {
                warn!(session_id, idle_secs = slot.idle.as_secs(), "Session inactive, restarting");
                self.start_session(session_id).await;
            } else if slot.uptime >= config.health_check_interval()
                && self.restart_attempts.remove(&session_id).is_some()
            {
                debug!(session_id, "Session healthy, restart counter reset");
            }
        }

        debug!(status = ?self.status(), "Fleet health check");
    }

    fn status(&self) -> Vec<SessionReport> {
        let mut ids: Vec<i64> = self.registry.session_ids();
        ids.extend(self.pending_restarts.keys().copied());
        ids.extend(self.restart_attempts.keys().copied());
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .map(|session_id| SessionReport {
                session_id,
                live: self.registry.is_live(session_id),
                idle_secs: self
                    .registry
                    .idle(session_id)
                    .map_or(0, |idle| idle.as_secs()),
                restart_attempts: self.restart_attempts.get(&session_id).copied().unwrap_or(0),
                restart_pending: self.pending_restarts.contains_key(&session_id),
            })
            .collect()
    }

    async fn shutdown(&mut self) {
        info!(sessions = self.registry.len(), "Stopping fleet");
        self.root.cancel();

        for (_, task) in self.pending_restarts.drain() {
            task.abort();
        }
        for (session_id, slot) in self.registry.drain() {
            slot.stop(session_id, STOP_GRACE).await;
        }
        // Migrations hold ownership mid-flight; let them finish
        while let Some(joined) = self.migrations.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Migration task failed");
            }
        }
        info!("Fleet stopped");
    }
}
