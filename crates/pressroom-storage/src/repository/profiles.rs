//! Profile repository

use crate::db::DatabasePool;
use crate::models::Profile;
use async_trait::async_trait;
use pressroom_common::types::{ProfileId, UserRole};
use pressroom_common::{Error, Result};
use uuid::Uuid;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>>;

    async fn create(&self, email: &str, full_name: Option<&str>, role: UserRole)
        -> Result<Profile>;
}

/// Database profile repository
pub struct DbProfileRepository {
    pool: DatabasePool,
}

impl DbProfileRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for DbProfileRepository {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at, updated_at FROM profiles WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn create(
        &self,
        email: &str,
        full_name: Option<&str>,
        role: UserRole,
    ) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, email, full_name, role, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(email.to_lowercase())
        .bind(full_name)
        .bind(role.to_string())
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
