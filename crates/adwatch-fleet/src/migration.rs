//! Ban migration
//!
//! Moves every channel owned by a banned session onto one live replacement.
//! Ownership is re-pointed before the join and rolled back per channel when the
//! join fails, so an owner always matches a session that actually joined.

use adwatch_core::entities::SubscriptionWithChannel;
use adwatch_core::ClientError;
use tracing::{error, info, instrument, warn};

use crate::balancer::LoadBalancer;
use crate::context::FleetContext;
use crate::error::FleetResult;
use crate::fleet::FleetHandle;
use crate::subscription::SubscriptionHandler;

/// Summary of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub banned_session: i64,
    pub target_session: Option<i64>,
    pub migrated: Vec<i64>,
    pub failed: Vec<i64>,
    /// No replacement was available; nothing was moved
    pub aborted: bool,
}

#[derive(Clone)]
pub struct MigrationHandler {
    ctx: FleetContext,
    balancer: LoadBalancer,
    fleet: FleetHandle,
}

impl MigrationHandler {
    pub fn new(ctx: FleetContext, balancer: LoadBalancer, fleet: FleetHandle) -> Self {
        Self {
            ctx,
            balancer,
            fleet,
        }
    }

    /// Migrate the subscriptions of `banned` and retire it with `reason`
    #[instrument(skip(self))]
    pub async fn migrate(&self, banned: i64, reason: &str) -> FleetResult<MigrationReport> {
        let mut report = MigrationReport {
            banned_session: banned,
            ..MigrationReport::default()
        };

        let owned = self.ctx.subscriptions().find_subscribed_by_session(banned).await?;
        if owned.is_empty() {
            info!("Banned session owned no channels");
            self.ctx.sessions().deactivate(banned, reason).await?;
            return Ok(report);
        }

        let fleet = &self.fleet;
        let target = self
            .balancer
            .select_with(|load| load.session.id != banned && fleet.is_live(load.session.id))
            .await?;
        let Some(target) = target else {
            error!(channels = owned.len(), "No replacement session, migration aborted");
            report.aborted = true;
            return Ok(report);
        };
        let Some(client) = self.fleet.client(target.id) else {
            error!(target_session = target.id, "Replacement lost its client, migration aborted");
            report.aborted = true;
            return Ok(report);
        };
        report.target_session = Some(target.id);

        info!(target_session = target.id, channels = owned.len(), "Migrating channels");

        for entry in &owned {
            let channel_id = entry.channel.id;
            match self.move_channel(entry, target.id, client.as_ref()).await {
                Ok(()) => report.migrated.push(channel_id),
                Err(e) => {
                    warn!(channel_id, error = %e, "Channel migration failed");
                    report.failed.push(channel_id);
                    if let Some(ClientError::Banned(rpc)) = e.client_error() {
                        self.fleet.report_ban(target.id, format!("banned: {rpc}"));
                        break;
                    }
                }
            }
        }

        self.ctx.sessions().deactivate(banned, reason).await?;
        info!(
            target_session = target.id,
            migrated = report.migrated.len(),
            failed = report.failed.len(),
            "Migration finished"
        );
        Ok(report)
    }

    /// Re-point one channel to `target`, rolling back when the join fails
    async fn move_channel(
        &self,
        entry: &SubscriptionWithChannel,
        target: i64,
        client: &dyn adwatch_core::UserClient,
    ) -> Result<(), MoveError> {
        let channel = &entry.channel;
        let link = channel.join_link().ok_or(MoveError::NoLink)?;
        let subscriptions = self.ctx.subscriptions();

        subscriptions.claim(channel.id, target).await.map_err(MoveError::Store)?;

        if let Err(e) = SubscriptionHandler::join(client, &link).await {
            if let Err(rollback) = subscriptions
                .claim(channel.id, entry.subscription.session_id)
                .await
            {
                error!(channel_id = channel.id, error = %rollback, "Ownership rollback failed");
            }
            return Err(MoveError::Join(e));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum MoveError {
    #[error("channel has no join link")]
    NoLink,
    #[error("store: {0}")]
    Store(adwatch_core::DomainError),
    #[error("join: {0}")]
    Join(ClientError),
}

impl MoveError {
    fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Join(e) => Some(e),
            Self::NoLink | Self::Store(_) => None,
        }
    }
}
