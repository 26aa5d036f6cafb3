//! Vendor API key repository (`api_keys` table)

use crate::db::DatabasePool;
use crate::models::{NewProviderKey, ProviderKey};
use async_trait::async_trait;
use chrono::Utc;
use pressroom_common::types::ProviderKeyId;
use pressroom_common::{Error, Result};
use uuid::Uuid;

/// Provider key repository trait
#[async_trait]
pub trait ProviderKeyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ProviderKey>>;

    /// Active keys, oldest first
    async fn list_active(&self) -> Result<Vec<ProviderKey>>;

    async fn create(&self, input: NewProviderKey) -> Result<ProviderKey>;

    async fn set_active(&self, id: ProviderKeyId, active: bool) -> Result<Option<ProviderKey>>;

    async fn delete(&self, id: ProviderKeyId) -> Result<bool>;
}

/// Database provider key repository
pub struct DbProviderKeyRepository {
    pool: DatabasePool,
}

impl DbProviderKeyRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderKeyRepository for DbProviderKeyRepository {
    async fn list(&self) -> Result<Vec<ProviderKey>> {
        sqlx::query_as::<_, ProviderKey>(
            r#"
            SELECT id, provider, name, key, is_active, created_at, updated_at
            FROM api_keys
            ORDER BY provider, created_at
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_active(&self) -> Result<Vec<ProviderKey>> {
        sqlx::query_as::<_, ProviderKey>(
            r#"
            SELECT id, provider, name, key, is_active, created_at, updated_at
            FROM api_keys
            WHERE is_active
            ORDER BY created_at
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn create(&self, input: NewProviderKey) -> Result<ProviderKey> {
        let now = Utc::now();
        sqlx::query_as::<_, ProviderKey>(
            r#"
            INSERT INTO api_keys (id, provider, name, key, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, provider, name, key, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.provider)
        .bind(&input.name)
        .bind(&input.key)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_active(&self, id: ProviderKeyId, active: bool) -> Result<Option<ProviderKey>> {
        sqlx::query_as::<_, ProviderKey>(
            r#"
            UPDATE api_keys SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, provider, name, key, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: ProviderKeyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
