//! Fake Telegram client and fleet harness

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adwatch_bus::{EventBus, LocalBus, SubscribeBridge};
use adwatch_common::FleetConfig;
use adwatch_core::{
    AccountInfo, ChannelInfo, ClientError, ClientFactory, ClientResult, IncomingMessage,
    InviteCheck, UserClient, UserbotSession,
};
use adwatch_fleet::{
    FleetContext, FleetCore, FleetHandle, FleetResult, LoadBalancer, RequestListener,
    SubscriptionHandler,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::MemoryStore;

/// Text the classifier accepts as an advertisement
pub const AD_TEXT: &str = "Авторский курс, бесплатно! Эксперт школа. Реклама, erid: 2VtzqwX";

/// Poll `check` until it holds or five seconds pass
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

pub fn channel_info(telegram_id: i64, title: &str, username: Option<&str>) -> ChannelInfo {
    ChannelInfo {
        telegram_id,
        title: title.to_string(),
        username: username.map(str::to_string),
    }
}

pub fn post(chat_id: i64, message_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id,
        message_id,
        text: text.to_string(),
        date: Utc::now(),
    }
}

/// Scriptable in-memory Telegram account
pub struct FakeClient {
    session_id: i64,
    connected: AtomicBool,
    /// Public channels that exist, by handle
    public: Mutex<HashMap<String, ChannelInfo>>,
    /// Invite hashes that exist
    invites: Mutex<HashMap<String, ChannelInfo>>,
    /// Handles and hashes the account already joined
    joined: Mutex<HashSet<String>>,
    /// Error returned by every join, when set
    join_error: Mutex<Option<ClientError>>,
    sink: Mutex<Option<mpsc::Sender<IncomingMessage>>>,
    exit_tx: mpsc::UnboundedSender<ClientResult<()>>,
    exit_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ClientResult<()>>>,
    join_calls: AtomicUsize,
    /// Heartbeat calls never return while set
    hung: AtomicBool,
    pings: AtomicUsize,
}

impl FakeClient {
    pub fn new(session_id: i64) -> Arc<Self> {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            session_id,
            connected: AtomicBool::new(true),
            public: Mutex::new(HashMap::new()),
            invites: Mutex::new(HashMap::new()),
            joined: Mutex::new(HashSet::new()),
            join_error: Mutex::new(None),
            sink: Mutex::new(None),
            exit_tx,
            exit_rx: tokio::sync::Mutex::new(exit_rx),
            join_calls: AtomicUsize::new(0),
            hung: AtomicBool::new(false),
            pings: AtomicUsize::new(0),
        })
    }

    pub fn with_public(self: Arc<Self>, handle: &str, info: ChannelInfo) -> Arc<Self> {
        self.public.lock().insert(handle.to_string(), info);
        self
    }

    pub fn with_invite(self: Arc<Self>, hash: &str, info: ChannelInfo) -> Arc<Self> {
        self.invites.lock().insert(hash.to_string(), info);
        self
    }

    /// Mark a handle or invite hash as already joined
    pub fn mark_joined(&self, key: &str) {
        self.joined.lock().insert(key.to_string());
    }

    pub fn has_joined(&self, key: &str) -> bool {
        self.joined.lock().contains(key)
    }

    pub fn fail_joins_with(&self, error: ClientError) {
        *self.join_error.lock() = Some(error);
    }

    pub fn join_calls(&self) -> usize {
        self.join_calls.load(Ordering::SeqCst)
    }

    /// Make `me` and `reconnect` hang forever, like a silently dead link
    pub fn hang(&self) {
        self.hung.store(true, Ordering::SeqCst);
    }

    /// Report the link as down without ending the update loop
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Answered `me` calls
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    async fn stall_if_hung(&self) {
        if self.hung.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    /// Whether the update loop is running
    pub fn is_running(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Push a post into the running update loop
    pub async fn deliver(&self, message: IncomingMessage) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            let _ = sink.send(message).await;
        }
    }

    /// End the running update loop with `result`
    pub fn exit(&self, result: ClientResult<()>) {
        let _ = self.exit_tx.send(result);
    }

    fn begin_join(&self, key: &str) -> ClientResult<()> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.join_error.lock().clone() {
            return Err(error);
        }
        if self.joined.lock().contains(key) {
            return Err(ClientError::AlreadyParticipant);
        }
        Ok(())
    }
}

#[async_trait]
impl UserClient for FakeClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> ClientResult<()> {
        self.stall_if_hung().await;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn me(&self) -> ClientResult<AccountInfo> {
        self.stall_if_hung().await;
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(AccountInfo {
            user_id: 7_000 + self.session_id,
            display_name: format!("Account {}", self.session_id),
            username: None,
        })
    }

    async fn resolve_public(&self, handle: &str) -> ClientResult<ChannelInfo> {
        self.public
            .lock()
            .get(handle)
            .cloned()
            .ok_or_else(|| ClientError::transient("USERNAME_NOT_OCCUPIED"))
    }

    async fn join_public(&self, handle: &str) -> ClientResult<ChannelInfo> {
        self.begin_join(handle)?;
        let info = self.resolve_public(handle).await?;
        self.mark_joined(handle);
        Ok(info)
    }

    async fn import_invite(&self, hash: &str) -> ClientResult<ChannelInfo> {
        self.begin_join(hash)?;
        let info = self
            .invites
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| ClientError::transient("INVITE_HASH_INVALID"))?;
        self.mark_joined(hash);
        Ok(info)
    }

    async fn check_invite(&self, hash: &str) -> ClientResult<InviteCheck> {
        let info = self
            .invites
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| ClientError::transient("INVITE_HASH_INVALID"))?;
        if self.has_joined(hash) {
            Ok(InviteCheck::Member(info))
        } else {
            Ok(InviteCheck::NotMember { title: info.title })
        }
    }

    async fn run(&self, sink: mpsc::Sender<IncomingMessage>) -> ClientResult<()> {
        *self.sink.lock() = Some(sink);
        let result = self
            .exit_rx
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Ok(()));
        self.sink.lock().take();
        result
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.sink.lock().take();
    }
}

/// Hands out pre-registered fake clients
#[derive(Default)]
pub struct FakeFactory {
    clients: Mutex<HashMap<i64, Arc<FakeClient>>>,
    errors: Mutex<HashMap<i64, ClientError>>,
    created: Mutex<HashMap<i64, usize>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, client: Arc<FakeClient>) -> Arc<FakeClient> {
        self.clients.lock().insert(client.session_id, Arc::clone(&client));
        client
    }

    /// Make `create` fail for a session
    pub fn fail_with(&self, session_id: i64, error: ClientError) {
        self.errors.lock().insert(session_id, error);
    }

    /// Let `create` succeed again for a session
    pub fn recover(&self, session_id: i64) {
        self.errors.lock().remove(&session_id);
    }

    /// Successful `create` calls for a session
    pub fn created(&self, session_id: i64) -> usize {
        self.created.lock().get(&session_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(&self, session: &UserbotSession) -> ClientResult<Arc<dyn UserClient>> {
        if let Some(error) = self.errors.lock().get(&session.id).cloned() {
            return Err(error);
        }
        let client = self
            .clients
            .lock()
            .get(&session.id)
            .cloned()
            .ok_or(ClientError::NotAuthorized)?;
        client.connected.store(true, Ordering::SeqCst);
        *self.created.lock().entry(session.id).or_insert(0) += 1;
        Ok(client)
    }
}

/// Fleet settings for tests: immediate restarts, default intervals
pub fn test_config() -> FleetConfig {
    FleetConfig {
        restart_delay_secs: 0,
        restart_max_delay_secs: 0,
        ..FleetConfig::default()
    }
}

/// A running fleet core over the in-memory store and the in-process bus
pub struct TestFleet {
    pub store: Arc<MemoryStore>,
    pub bus: Arc<LocalBus>,
    pub factory: Arc<FakeFactory>,
    pub ctx: FleetContext,
    pub fleet: FleetHandle,
    shutdown: CancellationToken,
    core: JoinHandle<FleetResult<()>>,
    listener: Option<JoinHandle<FleetResult<()>>>,
}

impl TestFleet {
    pub async fn start(store: Arc<MemoryStore>, factory: Arc<FakeFactory>) -> Self {
        Self::start_with_config(store, factory, test_config()).await
    }

    pub async fn start_with_config(
        store: Arc<MemoryStore>,
        factory: Arc<FakeFactory>,
        config: FleetConfig,
    ) -> Self {
        let bus = Arc::new(LocalBus::new());
        let ctx = FleetContext::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            bus.clone(),
            config,
        );
        let core = FleetCore::new(ctx.clone(), factory.clone());
        let fleet = core.handle();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(core.run(shutdown.clone()));

        Self {
            store,
            bus,
            factory,
            ctx,
            fleet,
            shutdown,
            core: task,
            listener: None,
        }
    }

    /// Serve subscribe requests from the bus
    pub async fn listen(&mut self) {
        let listener = RequestListener::new(self.bus.clone(), self.subscription_handler());
        self.listener = Some(tokio::spawn(listener.run(self.shutdown.clone())));
        let bus = self.bus.clone();
        assert!(
            wait_until(|| {
                let bus = bus.clone();
                async move { bus.subscriber_count(&adwatch_bus::Topic::SubscribeRequests) > 0 }
            })
            .await,
            "listener never subscribed"
        );
    }

    pub fn balancer(&self) -> LoadBalancer {
        LoadBalancer::new(self.store.clone())
    }

    pub fn subscription_handler(&self) -> SubscriptionHandler {
        SubscriptionHandler::new(self.ctx.clone(), self.balancer(), self.fleet.clone())
    }

    pub fn bridge(&self, timeout: Duration) -> SubscribeBridge {
        let bus: Arc<dyn EventBus> = self.bus.clone();
        SubscribeBridge::new(bus, timeout)
    }

    /// Wait until every session in `ids` has a live client
    pub async fn wait_live(&self, ids: &[i64]) -> bool {
        let fleet = self.fleet.clone();
        let ids = ids.to_vec();
        wait_until(|| {
            let fleet = fleet.clone();
            let ids = ids.clone();
            async move { ids.iter().all(|id| fleet.is_live(*id)) }
        })
        .await
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Some(listener) = self.listener {
            let _ = listener.await;
        }
        let _ = self.core.await;
    }
}
