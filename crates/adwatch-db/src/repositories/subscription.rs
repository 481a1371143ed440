//! PostgreSQL implementation of SubscriptionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use adwatch_core::entities::{ChannelSubscription, SubscriptionWithChannel};
use adwatch_core::error::DomainError;
use adwatch_core::traits::{RepoResult, SubscriptionRepository};

use crate::models::{SubscriptionModel, SubscriptionWithChannelModel};

use super::error::{channel_not_found, map_db_error, map_unique_violation};

/// PostgreSQL implementation of SubscriptionRepository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new PgSubscriptionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    #[instrument(skip(self))]
    async fn claim(&self, channel_id: i64, session_id: i64) -> RepoResult<ChannelSubscription> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Serializes concurrent claims on the same channel
        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM channels WHERE id = $1 FOR UPDATE")
            .bind(channel_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if locked.is_none() {
            return Err(channel_not_found(channel_id));
        }

        sqlx::query(
            r"
            UPDATE channel_subscriptions
            SET is_subscribed = FALSE, updated_at = NOW()
            WHERE channel_id = $1 AND userbot_id <> $2 AND is_subscribed
            ",
        )
        .bind(channel_id)
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let model = sqlx::query_as::<_, SubscriptionModel>(
            r"
            INSERT INTO channel_subscriptions (channel_id, userbot_id, is_subscribed)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (channel_id, userbot_id) DO UPDATE
            SET is_subscribed = TRUE, updated_at = NOW()
            RETURNING id, channel_id, userbot_id, is_subscribed, created_at, updated_at
            ",
        )
        .bind(channel_id)
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::DatabaseError(format!("channel {channel_id} already has an owner"))
            })
        })?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(ChannelSubscription::from(model))
    }

    #[instrument(skip(self))]
    async fn release(&self, channel_id: i64, session_id: i64) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE channel_subscriptions
            SET is_subscribed = FALSE, updated_at = NOW()
            WHERE channel_id = $1 AND userbot_id = $2
            ",
        )
        .bind(channel_id)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SubscriptionNotFound {
                channel_id,
                session_id,
            });
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_subscribed_by_session(
        &self,
        session_id: i64,
    ) -> RepoResult<Vec<SubscriptionWithChannel>> {
        let results = sqlx::query_as::<_, SubscriptionWithChannelModel>(
            r"
            SELECT s.id, s.channel_id, s.userbot_id, s.is_subscribed, s.created_at, s.updated_at,
                   c.telegram_id, c.title, c.main_username, c.link_subscription, c.is_private,
                   c.created_at AS channel_created_at, c.updated_at AS channel_updated_at
            FROM channel_subscriptions s
            JOIN channels c ON c.id = s.channel_id
            WHERE s.userbot_id = $1 AND s.is_subscribed
            ORDER BY s.id
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(SubscriptionWithChannel::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_channel(&self, channel_id: i64) -> RepoResult<Vec<ChannelSubscription>> {
        let results = sqlx::query_as::<_, SubscriptionModel>(
            r"
            SELECT id, channel_id, userbot_id, is_subscribed, created_at, updated_at
            FROM channel_subscriptions
            WHERE channel_id = $1
            ORDER BY id
            ",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ChannelSubscription::from).collect())
    }
}
