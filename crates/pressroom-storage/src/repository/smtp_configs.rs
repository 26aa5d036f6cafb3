//! SMTP sender configuration repository

use crate::db::DatabasePool;
use crate::models::{CreateSmtpConfig, SmtpConfig};
use async_trait::async_trait;
use chrono::Utc;
use pressroom_common::types::SmtpConfigId;
use pressroom_common::{Error, Result};
use uuid::Uuid;

/// SMTP config repository trait
#[async_trait]
pub trait SmtpConfigRepository: Send + Sync {
    async fn list(&self, active_only: bool) -> Result<Vec<SmtpConfig>>;

    async fn get(&self, id: SmtpConfigId) -> Result<Option<SmtpConfig>>;

    async fn create(&self, input: CreateSmtpConfig) -> Result<SmtpConfig>;

    async fn set_active(&self, id: SmtpConfigId, active: bool) -> Result<Option<SmtpConfig>>;

    async fn delete(&self, id: SmtpConfigId) -> Result<bool>;
}

/// Database SMTP config repository
pub struct DbSmtpConfigRepository {
    pool: DatabasePool,
}

impl DbSmtpConfigRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SmtpConfigRepository for DbSmtpConfigRepository {
    async fn list(&self, active_only: bool) -> Result<Vec<SmtpConfig>> {
        sqlx::query_as::<_, SmtpConfig>(
            r#"
            SELECT id, name, host, port, username, password, encryption, from_email,
                   from_name, is_active, created_at, updated_at
            FROM smtp_configs
            WHERE is_active OR NOT $1
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: SmtpConfigId) -> Result<Option<SmtpConfig>> {
        sqlx::query_as::<_, SmtpConfig>(
            r#"
            SELECT id, name, host, port, username, password, encryption, from_email,
                   from_name, is_active, created_at, updated_at
            FROM smtp_configs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn create(&self, input: CreateSmtpConfig) -> Result<SmtpConfig> {
        let now = Utc::now();
        sqlx::query_as::<_, SmtpConfig>(
            r#"
            INSERT INTO smtp_configs (
                id, name, host, port, username, password, encryption, from_email,
                from_name, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10)
            RETURNING id, name, host, port, username, password, encryption, from_email,
                      from_name, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(&input.host)
        .bind(input.port)
        .bind(&input.username)
        .bind(&input.password)
        .bind(input.encryption.to_string())
        .bind(&input.from_email)
        .bind(&input.from_name)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_active(&self, id: SmtpConfigId, active: bool) -> Result<Option<SmtpConfig>> {
        sqlx::query_as::<_, SmtpConfig>(
            r#"
            UPDATE smtp_configs SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, host, port, username, password, encryption, from_email,
                      from_name, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: SmtpConfigId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM smtp_configs WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
