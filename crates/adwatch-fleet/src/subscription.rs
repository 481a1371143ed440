//! Subscription handling
//!
//! Serves subscribe requests: balances each link onto a session, joins it and
//! records ownership. Every link yields exactly one `ChannelResult`.

use adwatch_bus::{ChannelResult, SubscribeRequest, SubscribeResponse};
use adwatch_core::entities::{ChannelUpsert, UserbotSession};
use adwatch_core::traits::RepoResult;
use adwatch_core::{ChannelInfo, ChannelLink, ClientError, ClientResult, InviteCheck, UserClient};
use tracing::{info, instrument, warn};

use crate::balancer::LoadBalancer;
use crate::context::FleetContext;
use crate::fleet::FleetHandle;

/// Error text when no session can take the request
pub const NO_USERBOT_AVAILABLE: &str = "no userbot available";
/// Error text when the chosen session has no running client
pub const CLIENT_UNAVAILABLE: &str = "userbot client unavailable";

/// Join primitive plus request handling
#[derive(Clone)]
pub struct SubscriptionHandler {
    ctx: FleetContext,
    balancer: LoadBalancer,
    fleet: FleetHandle,
}

impl SubscriptionHandler {
    pub fn new(ctx: FleetContext, balancer: LoadBalancer, fleet: FleetHandle) -> Self {
        Self {
            ctx,
            balancer,
            fleet,
        }
    }

    /// Serve one subscribe request
    #[instrument(skip(self, request), fields(request_id = %request.request_id, links = request.channel_links.len()))]
    pub async fn handle_request(&self, request: &SubscribeRequest) -> SubscribeResponse {
        match self.select_live().await {
            Ok(Some(_)) => {}
            Ok(None) => return SubscribeResponse::rejected(request, NO_USERBOT_AVAILABLE),
            Err(e) => {
                warn!(error = %e, "Session lookup failed");
                return SubscribeResponse::rejected(request, e.to_string());
            }
        }

        let mut userbot_id = 0;
        let mut results = Vec::with_capacity(request.channel_links.len());
        for link in &request.channel_links {
            let (result, owner) = self.subscribe_link(link).await;
            if userbot_id == 0 {
                userbot_id = owner.unwrap_or(0);
            }
            results.push(result);
        }

        let response = SubscribeResponse::completed(request, userbot_id, results);
        info!(
            joined = response.succeeded().count(),
            userbot_id,
            "Subscribe request handled"
        );
        response
    }

    /// Least-loaded eligible session that has a running client
    async fn select_live(&self) -> RepoResult<Option<UserbotSession>> {
        let fleet = &self.fleet;
        self.balancer
            .select_with(|load| fleet.is_live(load.session.id))
            .await
    }

    /// Join one link on the least-loaded session; returns the owner on success
    async fn subscribe_link(&self, link: &str) -> (ChannelResult, Option<i64>) {
        let session = match self.select_live().await {
            Ok(Some(session)) => session,
            Ok(None) => return (ChannelResult::failed(link, NO_USERBOT_AVAILABLE), None),
            Err(e) => return (ChannelResult::failed(link, e.to_string()), None),
        };
        let Some(client) = self.fleet.client(session.id) else {
            warn!(session_id = session.id, "Selected session has no running client");
            return (ChannelResult::failed(link, CLIENT_UNAVAILABLE), None);
        };

        let info = match Self::join(client.as_ref(), link).await {
            Ok(info) => info,
            Err(e) => {
                warn!(session_id = session.id, link, error = %e, "Join failed");
                if let ClientError::Banned(rpc) = &e {
                    self.fleet.report_ban(session.id, format!("banned: {rpc}"));
                }
                return (ChannelResult::failed(link, e.to_string()), None);
            }
        };

        if let Err(e) = self.record(session.id, link, &info).await {
            warn!(session_id = session.id, link, error = %e, "Failed to record subscription");
            return (
                ChannelResult::failed(link, format!("failed to record subscription: {e}")),
                None,
            );
        }

        info!(
            session_id = session.id,
            telegram_id = info.telegram_id,
            title = %info.title,
            "Channel joined"
        );
        (
            ChannelResult::joined(link, info.telegram_id, info.title, info.username),
            Some(session.id),
        )
    }

    /// Upsert the channel and make `session_id` its single owner
    async fn record(&self, session_id: i64, link: &str, info: &ChannelInfo) -> RepoResult<()> {
        let stored_link = ChannelLink::parse(link).map_or_else(|_| link.to_string(), |l| l.canonical());
        let channel = self
            .ctx
            .channels()
            .upsert(&ChannelUpsert::new(
                info.telegram_id,
                info.title.clone(),
                info.username.clone(),
                stored_link,
            ))
            .await?;
        self.ctx.subscriptions().claim(channel.id, session_id).await?;
        Ok(())
    }

    /// Join a channel link with `client`.
    ///
    /// "Already a participant" is a success: the channel identity is recovered
    /// with a lookup instead of a second join.
    pub async fn join(client: &dyn UserClient, link: &str) -> ClientResult<ChannelInfo> {
        let parsed = ChannelLink::parse(link).map_err(|_| ClientError::InvalidLink(link.to_string()))?;

        match parsed {
            ChannelLink::Public { handle } => match client.join_public(&handle).await {
                Err(ClientError::AlreadyParticipant) => client.resolve_public(&handle).await,
                other => other,
            },
            ChannelLink::Invite { hash } => match client.import_invite(&hash).await {
                Ok(info) => Ok(info),
                Err(e) if e.is_ban() => Err(e),
                Err(e) => match client.check_invite(&hash).await {
                    Ok(InviteCheck::Member(info)) => Ok(info),
                    Ok(InviteCheck::NotMember { .. }) => Err(e),
                    Err(check) if check.is_ban() => Err(check),
                    Err(check) => Err(if e == ClientError::AlreadyParticipant { check } else { e }),
                },
            },
        }
    }

    /// `join` folded into a per-link result
    pub async fn perform_join(client: &dyn UserClient, link: &str) -> ChannelResult {
        match Self::join(client, link).await {
            Ok(info) => ChannelResult::joined(link, info.telegram_id, info.title, info.username),
            Err(e) => ChannelResult::failed(link, e.to_string()),
        }
    }
}
