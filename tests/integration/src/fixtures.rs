//! In-memory store
//!
//! Implements every repository trait over one mutex-guarded state, so each
//! call is atomic the way the PostgreSQL implementation's transactions are.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use adwatch_core::{
    Channel, ChannelNews, ChannelRepository, ChannelSubscription, ChannelUpsert, DomainError,
    InsertOutcome, NewChannelNews, NewsRepository, RepoResult, SessionCredential, SessionLoad,
    SessionRepository, SessionStatus, SubscriptionRepository, SubscriptionWithChannel,
    UserbotSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Counter for unique test data
static COUNTER: AtomicI64 = AtomicI64::new(1);

/// Get a unique number for test data
pub fn unique_suffix() -> i64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// An active, eligible session
pub fn session(id: i64) -> UserbotSession {
    let now = Utc::now();
    UserbotSession {
        id,
        name: format!("userbot {id}"),
        phone: format!("+7900000{id:04}"),
        api_id: 12345,
        api_hash: "0123456789abcdef".to_string(),
        credential: SessionCredential::StringSession(format!("session-{id}")),
        status: SessionStatus::Active,
        is_active: true,
        max_channels: 500,
        last_error: None,
        last_activity: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
struct State {
    sessions: BTreeMap<i64, UserbotSession>,
    channels: BTreeMap<i64, Channel>,
    subscriptions: Vec<ChannelSubscription>,
    news: Vec<ChannelNews>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn subscribed_count(&self, session_id: i64) -> i64 {
        self.subscriptions
            .iter()
            .filter(|s| s.session_id == session_id && s.is_subscribed)
            .count() as i64
    }
}

/// Store shared by every repository trait
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with active sessions `ids`
    pub fn with_sessions(ids: &[i64]) -> Self {
        let store = Self::new();
        for id in ids {
            store.add_session(session(*id));
        }
        store
    }

    pub fn add_session(&self, session: UserbotSession) {
        self.state.lock().sessions.insert(session.id, session);
    }

    /// Insert a channel owned by `owner`
    pub fn add_owned_channel(&self, telegram_id: i64, username: &str, owner: i64) -> Channel {
        let now = Utc::now();
        let mut state = self.state.lock();
        let channel = Channel {
            id: state.next_id(),
            telegram_id,
            title: format!("Channel {username}"),
            main_username: Some(username.to_string()),
            link_subscription: Some(format!("https://t.me/{username}")),
            is_private: false,
            created_at: now,
            updated_at: now,
        };
        state.channels.insert(channel.id, channel.clone());
        let id = state.next_id();
        state.subscriptions.push(ChannelSubscription {
            id,
            channel_id: channel.id,
            session_id: owner,
            is_subscribed: true,
            created_at: now,
            updated_at: now,
        });
        channel
    }

    pub fn session(&self, id: i64) -> Option<UserbotSession> {
        self.state.lock().sessions.get(&id).cloned()
    }

    pub fn channel_by_telegram_id(&self, telegram_id: i64) -> Option<Channel> {
        self.state
            .lock()
            .channels
            .values()
            .find(|c| c.telegram_id == telegram_id)
            .cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().channels.len()
    }

    pub fn news_count(&self) -> usize {
        self.state.lock().news.len()
    }

    /// Sessions holding `is_subscribed = true` for a channel
    pub fn owners(&self, channel_id: i64) -> Vec<i64> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.channel_id == channel_id && s.is_subscribed)
            .map(|s| s.session_id)
            .collect()
    }

    /// Channels currently owned by a session
    pub fn owned_by(&self, session_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.session_id == session_id && s.is_subscribed)
            .map(|s| s.channel_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Every channel with more than one subscribed row
    pub fn multi_owned_channels(&self) -> Vec<i64> {
        let channel_ids: Vec<i64> = self.state.lock().channels.keys().copied().collect();
        channel_ids
            .into_iter()
            .filter(|id| self.owners(*id).len() > 1)
            .collect()
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserbotSession>> {
        Ok(self.session(id))
    }

    async fn find_all(&self) -> RepoResult<Vec<UserbotSession>> {
        Ok(self.state.lock().sessions.values().cloned().collect())
    }

    async fn find_eligible(&self) -> RepoResult<Vec<UserbotSession>> {
        Ok(self
            .state
            .lock()
            .sessions
            .values()
            .filter(|s| s.is_eligible())
            .cloned()
            .collect())
    }

    async fn find_eligible_with_load(&self) -> RepoResult<Vec<SessionLoad>> {
        let state = self.state.lock();
        Ok(state
            .sessions
            .values()
            .filter(|s| s.is_eligible())
            .map(|s| SessionLoad {
                session: s.clone(),
                subscribed: state.subscribed_count(s.id),
            })
            .collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: SessionStatus,
        last_error: Option<&str>,
    ) -> RepoResult<()> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or(DomainError::SessionNotFound(id))?;
        session.status = status;
        session.last_error = last_error.map(str::to_string);
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn deactivate(&self, id: i64, reason: &str) -> RepoResult<()> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or(DomainError::SessionNotFound(id))?;
        session.status = SessionStatus::Error;
        session.is_active = false;
        session.last_error = Some(reason.to_string());
        Ok(())
    }

    async fn touch_activity(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or(DomainError::SessionNotFound(id))?;
        session.last_activity = Some(at);
        Ok(())
    }
}

#[async_trait]
impl ChannelRepository for MemoryStore {
    async fn find_by_telegram_id(&self, telegram_id: i64) -> RepoResult<Option<Channel>> {
        Ok(self.channel_by_telegram_id(telegram_id.abs()))
    }

    async fn upsert(&self, upsert: &ChannelUpsert) -> RepoResult<Channel> {
        let now = Utc::now();
        let mut state = self.state.lock();
        let existing = state
            .channels
            .values()
            .find(|c| c.telegram_id == upsert.telegram_id)
            .map(|c| c.id);
        let id = match existing {
            Some(id) => id,
            None => state.next_id(),
        };
        let created_at = state.channels.get(&id).map_or(now, |c| c.created_at);
        let channel = Channel {
            id,
            telegram_id: upsert.telegram_id,
            title: upsert.title.clone(),
            main_username: upsert.username.clone(),
            link_subscription: Some(upsert.link.clone()),
            is_private: upsert.is_private(),
            created_at,
            updated_at: now,
        };
        state.channels.insert(id, channel.clone());
        Ok(channel)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn claim(&self, channel_id: i64, session_id: i64) -> RepoResult<ChannelSubscription> {
        let now = Utc::now();
        let mut state = self.state.lock();
        if !state.channels.contains_key(&channel_id) {
            return Err(DomainError::ChannelNotFound(channel_id));
        }

        for row in state
            .subscriptions
            .iter_mut()
            .filter(|s| s.channel_id == channel_id && s.session_id != session_id)
        {
            row.is_subscribed = false;
        }

        if let Some(row) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.channel_id == channel_id && s.session_id == session_id)
        {
            row.is_subscribed = true;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = ChannelSubscription {
            id: state.next_id(),
            channel_id,
            session_id,
            is_subscribed: true,
            created_at: now,
            updated_at: now,
        };
        state.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn release(&self, channel_id: i64, session_id: i64) -> RepoResult<()> {
        let mut state = self.state.lock();
        let row = state
            .subscriptions
            .iter_mut()
            .find(|s| s.channel_id == channel_id && s.session_id == session_id)
            .ok_or(DomainError::SubscriptionNotFound {
                channel_id,
                session_id,
            })?;
        row.is_subscribed = false;
        Ok(())
    }

    async fn find_subscribed_by_session(
        &self,
        session_id: i64,
    ) -> RepoResult<Vec<SubscriptionWithChannel>> {
        let state = self.state.lock();
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| s.session_id == session_id && s.is_subscribed)
            .filter_map(|s| {
                state.channels.get(&s.channel_id).map(|c| SubscriptionWithChannel {
                    subscription: s.clone(),
                    channel: c.clone(),
                })
            })
            .collect())
    }

    async fn find_by_channel(&self, channel_id: i64) -> RepoResult<Vec<ChannelSubscription>> {
        Ok(self
            .state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.channel_id == channel_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NewsRepository for MemoryStore {
    async fn insert(&self, news: &NewChannelNews) -> RepoResult<InsertOutcome> {
        let mut state = self.state.lock();
        if state
            .news
            .iter()
            .any(|n| n.channel_id == news.channel_id && n.message_id == news.message_id)
        {
            return Ok(InsertOutcome::Duplicate);
        }
        let row = ChannelNews {
            id: state.next_id(),
            channel_id: news.channel_id,
            message_id: news.message_id,
            message: news.message.clone(),
            created_at: Utc::now(),
        };
        state.news.push(row.clone());
        Ok(InsertOutcome::Inserted(row))
    }
}
