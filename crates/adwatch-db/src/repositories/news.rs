//! PostgreSQL implementation of NewsRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use adwatch_core::entities::{ChannelNews, NewChannelNews};
use adwatch_core::traits::{InsertOutcome, NewsRepository, RepoResult};

use crate::models::ChannelNewsModel;

use super::error::map_db_error;

/// PostgreSQL implementation of NewsRepository
#[derive(Clone)]
pub struct PgNewsRepository {
    pool: PgPool,
}

impl PgNewsRepository {
    /// Create a new PgNewsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsRepository for PgNewsRepository {
    #[instrument(skip(self, news), fields(channel_id = news.channel_id, message_id = news.message_id))]
    async fn insert(&self, news: &NewChannelNews) -> RepoResult<InsertOutcome> {
        let inserted = sqlx::query_as::<_, ChannelNewsModel>(
            r"
            INSERT INTO channel_news (channel_id, message_id, message)
            VALUES ($1, $2, $3)
            ON CONFLICT (channel_id, message_id) DO NOTHING
            RETURNING id, channel_id, message_id, message, created_at
            ",
        )
        .bind(news.channel_id)
        .bind(news.message_id)
        .bind(&news.message)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(match inserted {
            Some(model) => InsertOutcome::Inserted(ChannelNews::from(model)),
            None => InsertOutcome::Duplicate,
        })
    }
}
