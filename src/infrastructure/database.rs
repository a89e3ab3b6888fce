//! 数据库基础设施

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Row,
};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::core::error::CoreError;

/// Postgres 文档存储
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig, database_url: &str) -> Result<Self, sqlx::Error> {
        info!(
            "连接数据库: {}",
            database_url
                .split('@')
                .last()
                .unwrap_or("<unknown>")
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                id UUID NOT NULL,
                body JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (kind, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("数据表已就绪");
        Ok(())
    }

    pub async fn list_values(&self, kind: &str) -> Result<Vec<serde_json::Value>, CoreError> {
        let rows = sqlx::query("SELECT body FROM records WHERE kind = $1")
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get::<serde_json::Value, _>("body").map_err(CoreError::from))
            .collect()
    }

    pub async fn get_value(&self, kind: &str, id: Uuid) -> Result<Option<serde_json::Value>, CoreError> {
        let row = sqlx::query("SELECT body FROM records WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<serde_json::Value, _>("body").map_err(CoreError::from))
            .transpose()
    }

    pub async fn put_value(&self, kind: &str, id: Uuid, body: serde_json::Value) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (kind, id, body) VALUES ($1, $2, $3)
            ON CONFLICT (kind, id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(kind)
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_value(&self, kind: &str, id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, kind: &str) -> Result<usize, CoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE kind = $1")
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0.max(0) as usize)
    }
}
