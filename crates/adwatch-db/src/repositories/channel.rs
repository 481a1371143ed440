//! PostgreSQL implementation of ChannelRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use adwatch_core::entities::{Channel, ChannelUpsert};
use adwatch_core::traits::{ChannelRepository, RepoResult};

use crate::models::ChannelModel;

use super::error::map_db_error;

/// PostgreSQL implementation of ChannelRepository
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    /// Create a new PgChannelRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    #[instrument(skip(self))]
    async fn find_by_telegram_id(&self, telegram_id: i64) -> RepoResult<Option<Channel>> {
        let result = sqlx::query_as::<_, ChannelModel>(
            r"
            SELECT id, telegram_id, title, main_username, link_subscription, is_private,
                   created_at, updated_at
            FROM channels
            WHERE telegram_id = $1
            ",
        )
        .bind(telegram_id.abs())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Channel::from))
    }

    #[instrument(skip(self))]
    async fn upsert(&self, channel: &ChannelUpsert) -> RepoResult<Channel> {
        let model = sqlx::query_as::<_, ChannelModel>(
            r"
            INSERT INTO channels (telegram_id, title, main_username, link_subscription, is_private)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id) DO UPDATE
            SET title = EXCLUDED.title,
                main_username = EXCLUDED.main_username,
                link_subscription = EXCLUDED.link_subscription,
                is_private = EXCLUDED.is_private,
                updated_at = NOW()
            RETURNING id, telegram_id, title, main_username, link_subscription, is_private,
                      created_at, updated_at
            ",
        )
        .bind(channel.telegram_id)
        .bind(&channel.title)
        .bind(&channel.username)
        .bind(&channel.link)
        .bind(channel.is_private())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Channel::from(model))
    }
}
