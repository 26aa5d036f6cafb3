//! Admin access token repository

use crate::db::DatabasePool;
use crate::models::AccessToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pressroom_common::types::{AccessTokenId, ProfileId};
use pressroom_common::{Error, Result};
use uuid::Uuid;

/// Access token repository trait
#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    /// Unexpired tokens sharing a prefix (for initial lookup)
    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<AccessToken>>;

    async fn create(
        &self,
        profile_id: ProfileId,
        name: &str,
        token_hash: &str,
        token_prefix: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessToken>;

    async fn update_last_used(&self, id: AccessTokenId) -> Result<()>;
}

/// Database access token repository
pub struct DbAccessTokenRepository {
    pool: DatabasePool,
}

impl DbAccessTokenRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessTokenRepository for DbAccessTokenRepository {
    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<AccessToken>> {
        sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id, profile_id, name, token_hash, token_prefix, expires_at,
                   last_used_at, created_at
            FROM access_tokens
            WHERE token_prefix = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            LIMIT 10
            "#,
        )
        .bind(prefix)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn create(
        &self,
        profile_id: ProfileId,
        name: &str,
        token_hash: &str,
        token_prefix: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessToken> {
        sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (id, profile_id, name, token_hash, token_prefix, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, profile_id, name, token_hash, token_prefix, expires_at,
                      last_used_at, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(profile_id)
        .bind(name)
        .bind(token_hash)
        .bind(token_prefix)
        .bind(expires_at)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update_last_used(&self, id: AccessTokenId) -> Result<()> {
        sqlx::query("UPDATE access_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
