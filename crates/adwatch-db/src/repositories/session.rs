//! PostgreSQL implementation of SessionRepository

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use adwatch_core::entities::{SessionLoad, SessionStatus, UserbotSession};
use adwatch_core::traits::{RepoResult, SessionRepository};

use crate::models::{SessionLoadModel, SessionModel};

use super::error::{map_db_error, session_not_found};

const SESSION_COLUMNS: &str = "u.id, u.name, u.phone, u.api_id, u.api_hash, u.session_file, \
     u.string_session, u.status, u.is_active, u.max_channels, u.last_error, u.last_activity, \
     u.created_at, u.updated_at";

/// PostgreSQL implementation of SessionRepository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
    sessions_dir: PathBuf,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository; `sessions_dir` locates default session files
    pub fn new(pool: PgPool, sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            sessions_dir: sessions_dir.into(),
        }
    }

    fn expect_row(result: &sqlx::postgres::PgQueryResult, id: i64) -> RepoResult<()> {
        if result.rows_affected() == 0 {
            return Err(session_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserbotSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM userbots u WHERE u.id = $1");
        let result = sqlx::query_as::<_, SessionModel>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(|m| m.into_entity(&self.sessions_dir)))
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> RepoResult<Vec<UserbotSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM userbots u ORDER BY u.id");
        let results = sqlx::query_as::<_, SessionModel>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(results
            .into_iter()
            .map(|m| m.into_entity(&self.sessions_dir))
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_eligible(&self) -> RepoResult<Vec<UserbotSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM userbots u \
             WHERE u.status = 'active' AND u.is_active ORDER BY u.id"
        );
        let results = sqlx::query_as::<_, SessionModel>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(results
            .into_iter()
            .map(|m| m.into_entity(&self.sessions_dir))
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_eligible_with_load(&self) -> RepoResult<Vec<SessionLoad>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS}, COUNT(s.id) FILTER (WHERE s.is_subscribed) AS subscribed \
             FROM userbots u \
             LEFT JOIN channel_subscriptions s ON s.userbot_id = u.id \
             WHERE u.status = 'active' AND u.is_active \
             GROUP BY u.id \
             ORDER BY u.id"
        );
        let results = sqlx::query_as::<_, SessionLoadModel>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(results
            .into_iter()
            .map(|m| m.into_entity(&self.sessions_dir))
            .collect())
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: i64,
        status: SessionStatus,
        last_error: Option<&str>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE userbots
            SET status = $2, last_error = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::expect_row(&result, id)
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, id: i64, reason: &str) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE userbots
            SET status = 'error', is_active = FALSE, last_error = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::expect_row(&result, id)
    }

    #[instrument(skip(self))]
    async fn touch_activity(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE userbots SET last_activity = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
