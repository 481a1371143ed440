//! Fleet context - dependency container for fleet components
//!
//! Holds the repositories, the event bus and the fleet settings.

use std::sync::Arc;

use adwatch_bus::EventBus;
use adwatch_common::FleetConfig;
use adwatch_core::traits::{
    ChannelRepository, NewsRepository, SessionRepository, SubscriptionRepository,
};

/// Shared dependencies of the fleet components
#[derive(Clone)]
pub struct FleetContext {
    sessions: Arc<dyn SessionRepository>,
    channels: Arc<dyn ChannelRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    news: Arc<dyn NewsRepository>,
    bus: Arc<dyn EventBus>,
    config: FleetConfig,
}

impl FleetContext {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        channels: Arc<dyn ChannelRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        news: Arc<dyn NewsRepository>,
        bus: Arc<dyn EventBus>,
        config: FleetConfig,
    ) -> Self {
        Self {
            sessions,
            channels,
            subscriptions,
            news,
            bus,
            config,
        }
    }

    // === Repositories ===

    pub fn sessions(&self) -> &dyn SessionRepository {
        self.sessions.as_ref()
    }

    /// Shared handle to the session repository
    pub fn sessions_arc(&self) -> Arc<dyn SessionRepository> {
        Arc::clone(&self.sessions)
    }

    pub fn channels(&self) -> &dyn ChannelRepository {
        self.channels.as_ref()
    }

    pub fn subscriptions(&self) -> &dyn SubscriptionRepository {
        self.subscriptions.as_ref()
    }

    pub fn news(&self) -> &dyn NewsRepository {
        self.news.as_ref()
    }

    // === Bus ===

    pub fn bus(&self) -> &dyn EventBus {
        self.bus.as_ref()
    }

    /// Shared handle to the event bus
    pub fn bus_arc(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.bus)
    }

    // === Settings ===

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }
}

impl std::fmt::Debug for FleetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetContext")
            .field("repositories", &"...")
            .field("bus", &"dyn EventBus")
            .field("config", &self.config)
            .finish()
    }
}
