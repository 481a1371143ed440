//! Session admin checks
//!
//! Connects each stored session once and reports whether it is usable.
//! Authorized sessions become active and unauthorized ones authorizing. Bans
//! and failures only set `last_error`; the ban path belongs to the fleet.

use std::sync::Arc;

use adwatch_core::{ClientError, ClientFactory, SessionRepository, SessionStatus, UserbotSession};
use tracing::{info, warn};

use crate::error::FleetResult;

/// Result of checking one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Authorized { user_id: i64, display_name: String },
    NotAuthorized,
    Banned(String),
    Failed(String),
}

impl CheckOutcome {
    #[inline]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

/// Operator-side session checker
pub struct SessionAdmin {
    sessions: Arc<dyn SessionRepository>,
    factory: Arc<dyn ClientFactory>,
}

impl SessionAdmin {
    pub fn new(sessions: Arc<dyn SessionRepository>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { sessions, factory }
    }

    /// Connect one session, record what it showed and disconnect again
    pub async fn check(&self, session: &UserbotSession) -> FleetResult<CheckOutcome> {
        let outcome = match self.factory.create(session).await {
            Ok(client) => {
                let outcome = match client.me().await {
                    Ok(me) => CheckOutcome::Authorized {
                        user_id: me.user_id,
                        display_name: me.display_name,
                    },
                    Err(e) => Self::outcome_of(e),
                };
                client.disconnect().await;
                outcome
            }
            Err(e) => Self::outcome_of(e),
        };

        match &outcome {
            CheckOutcome::Authorized { .. } => {
                self.sessions
                    .update_status(session.id, SessionStatus::Active, None)
                    .await?;
            }
            CheckOutcome::NotAuthorized => {
                self.sessions
                    .update_status(session.id, SessionStatus::Authorizing, Some("not authorized"))
                    .await?;
            }
            CheckOutcome::Banned(rpc) => {
                self.note_error(session, &format!("banned: {rpc}")).await?;
            }
            CheckOutcome::Failed(message) => self.note_error(session, message).await?,
        }
        Ok(outcome)
    }

    /// Check every stored session in id order
    pub async fn check_all(&self) -> FleetResult<Vec<(i64, CheckOutcome)>> {
        let sessions = self.sessions.find_all().await?;
        let mut outcomes = Vec::with_capacity(sessions.len());

        for session in sessions {
            let outcome = self.check(&session).await?;
            match &outcome {
                CheckOutcome::Authorized { user_id, display_name } => info!(
                    session_id = session.id,
                    user_id,
                    account = %display_name,
                    "Session authorized"
                ),
                other => warn!(session_id = session.id, outcome = ?other, "Session unusable"),
            }
            outcomes.push((session.id, outcome));
        }
        Ok(outcomes)
    }

    /// Keep the stored status, record the error text
    async fn note_error(&self, session: &UserbotSession, message: &str) -> FleetResult<()> {
        self.sessions
            .update_status(session.id, session.status, Some(message))
            .await?;
        Ok(())
    }

    fn outcome_of(err: ClientError) -> CheckOutcome {
        match err {
            ClientError::Banned(rpc) => CheckOutcome::Banned(rpc),
            ClientError::NotAuthorized => CheckOutcome::NotAuthorized,
            other => CheckOutcome::Failed(other.to_string()),
        }
    }
}
