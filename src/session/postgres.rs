use async_trait::async_trait;
use sqlx::{Executor, Pool, Row};

use super::{SessionKey, SessionStore};
use crate::{db::Database, error::Error};

/// Session flags kept in a Postgres key/value table.
pub struct PgSessionStore {
    pool: Pool<Database>,
}

impl PgSessionStore {
    #[tracing::instrument(name = "PgSessionStore::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS session_flags (key VARCHAR PRIMARY KEY, value TEXT NOT NULL)",
        )
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: SessionKey) -> Result<Option<String>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(
                sqlx::query("SELECT value FROM session_flags WHERE key = $1").bind(key.name()),
            )
            .await?;

        match maybe_result {
            Some(result) => Ok(Some(result.try_get("value")?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn set(&self, key: SessionKey, value: String) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO session_flags (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(key.name())
            .bind(&value),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute("DELETE FROM session_flags").await?;

        Ok(())
    }
}
