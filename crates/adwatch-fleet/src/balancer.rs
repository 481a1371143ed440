//! Load balancer
//!
//! Picks the eligible session with the fewest owned channels. Ties go to the
//! first session enumerated by the store, which is not a stable guarantee.

use std::sync::Arc;

use adwatch_core::entities::{SessionLoad, UserbotSession};
use adwatch_core::traits::{RepoResult, SessionRepository};

/// Least-loaded session selection
#[derive(Clone)]
pub struct LoadBalancer {
    sessions: Arc<dyn SessionRepository>,
}

impl LoadBalancer {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Eligible, under-capacity session with the fewest subscriptions
    pub async fn select_best_session(&self) -> RepoResult<Option<UserbotSession>> {
        self.select_with(|_| true).await
    }

    /// Like `select_best_session`, restricted to sessions accepted by `filter`
    pub async fn select_with<F>(&self, filter: F) -> RepoResult<Option<UserbotSession>>
    where
        F: Fn(&SessionLoad) -> bool + Send,
    {
        let loads = self.sessions.find_eligible_with_load().await?;
        let picked = pick_least_loaded(&loads, filter).map(|load| {
            tracing::debug!(
                session_id = load.session.id,
                subscribed = load.subscribed,
                candidates = loads.len(),
                "Selected session"
            );
            load.session.clone()
        });

        if picked.is_none() {
            tracing::warn!(candidates = loads.len(), "No session available");
        }
        Ok(picked)
    }
}

/// Minimum-load session among those with capacity that pass `filter`
pub fn pick_least_loaded<F>(loads: &[SessionLoad], filter: F) -> Option<&SessionLoad>
where
    F: Fn(&SessionLoad) -> bool,
{
    loads
        .iter()
        .filter(|load| load.session.is_eligible() && load.has_capacity() && filter(load))
        .min_by_key(|load| load.subscribed)
}
