//! Contact repository

use crate::db::DatabasePool;
use crate::models::{Contact, CreateContact, UpdateContact};
use async_trait::async_trait;
use chrono::Utc;
use pressroom_common::types::{ContactId, Page};
use pressroom_common::{Error, Result};
use uuid::Uuid;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// List contacts, optionally restricted to those carrying `tag`
    async fn list(&self, tag: Option<&str>, page: Page) -> Result<Vec<Contact>>;

    async fn get(&self, id: ContactId) -> Result<Option<Contact>>;

    async fn create(&self, input: CreateContact) -> Result<Contact>;

    async fn update(&self, id: ContactId, input: UpdateContact) -> Result<Option<Contact>>;

    async fn delete(&self, id: ContactId) -> Result<bool>;

    /// Sorted distinct tags across all contacts
    async fn distinct_tags(&self) -> Result<Vec<String>>;

    /// Subscribed contacts carrying any of `tags`; every subscribed
    /// contact when `tags` is empty
    async fn count_audience(&self, tags: &[String]) -> Result<i64>;
}

/// Database contact repository
pub struct DbContactRepository {
    pool: DatabasePool,
}

impl DbContactRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for DbContactRepository {
    async fn list(&self, tag: Option<&str>, page: Page) -> Result<Vec<Contact>> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, email, first_name, last_name, tags, is_subscribed, created_at, updated_at
            FROM contacts
            WHERE $1::TEXT IS NULL OR $1 = ANY(tags)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tag)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, email, first_name, last_name, tags, is_subscribed, created_at, updated_at
            FROM contacts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn create(&self, input: CreateContact) -> Result<Contact> {
        let now = Utc::now();
        sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (id, email, first_name, last_name, tags, is_subscribed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, email, first_name, last_name, tags, is_subscribed, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.email.trim().to_lowercase())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.tags)
        .bind(input.is_subscribed)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Validation(format!("Contact {} already exists", input.email))
            }
            other => Error::Database(other.to_string()),
        })
    }

    async fn update(&self, id: ContactId, input: UpdateContact) -> Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                tags = COALESCE($4, tags),
                is_subscribed = COALESCE($5, is_subscribed),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, tags, is_subscribed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.tags)
        .bind(input.is_subscribed)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: ContactId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn distinct_tags(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT tag FROM contacts, UNNEST(tags) AS tag ORDER BY tag",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn count_audience(&self, tags: &[String]) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM contacts
            WHERE is_subscribed
              AND (CARDINALITY($1::TEXT[]) = 0 OR tags && $1::TEXT[])
            "#,
        )
        .bind(tags)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
