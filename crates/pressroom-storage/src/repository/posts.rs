//! Post repository

use crate::db::DatabasePool;
use crate::models::{NewPost, Post, PostRow, PostStatus, UpdatePost};
use async_trait::async_trait;
use chrono::Utc;
use pressroom_common::types::{Page, PostId};
use pressroom_common::{Error, Result};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, featured_image, status, \
     author_id, published_at, seo_title, seo_description, seo_keywords, created_at, updated_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list(&self, status: Option<PostStatus>, page: Page) -> Result<Vec<Post>>;

    async fn get(&self, id: PostId) -> Result<Option<Post>>;

    /// Insert a post; `published_at` is stamped when the status is published
    async fn create(&self, input: NewPost) -> Result<Post>;

    async fn update(&self, id: PostId, input: UpdatePost) -> Result<Option<Post>>;

    async fn delete(&self, id: PostId) -> Result<bool>;
}

/// Database post repository
pub struct DbPostRepository {
    pool: DatabasePool,
}

impl DbPostRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error, slug: Option<&str>) -> Error {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Validation(format!(
            "A post with slug '{}' already exists",
            slug.unwrap_or_default()
        )),
        other => Error::Database(other.to_string()),
    }
}

#[async_trait]
impl PostRepository for DbPostRepository {
    async fn list(&self, status: Option<PostStatus>, page: Page) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {} FROM posts
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            POST_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Post::try_from).collect()
    }

    async fn get(&self, id: PostId) -> Result<Option<Post>> {
        sqlx::query_as::<_, PostRow>(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .map(Post::try_from)
            .transpose()
    }

    async fn create(&self, input: NewPost) -> Result<Post> {
        let now = Utc::now();
        let published_at = (input.status == PostStatus::Published).then_some(now);

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (
                id, title, slug, content, excerpt, featured_image, status, author_id,
                published_at, seo_title, seo_description, seo_keywords, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(&input.featured_image)
        .bind(input.status.as_str())
        .bind(input.author_id)
        .bind(published_at)
        .bind(&input.seo_title)
        .bind(&input.seo_description)
        .bind(&input.seo_keywords)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_write_error(e, Some(&input.slug)))?;

        Post::try_from(row)
    }

    async fn update(&self, id: PostId, input: UpdatePost) -> Result<Option<Post>> {
        sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                content = COALESCE($4, content),
                excerpt = COALESCE($5, excerpt),
                featured_image = COALESCE($6, featured_image),
                status = COALESCE($7, status),
                published_at = CASE
                    WHEN $7 = 'published' AND published_at IS NULL THEN NOW()
                    ELSE published_at
                END,
                seo_title = COALESCE($8, seo_title),
                seo_description = COALESCE($9, seo_description),
                seo_keywords = COALESCE($10, seo_keywords),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(&input.featured_image)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.seo_title)
        .bind(&input.seo_description)
        .bind(&input.seo_keywords)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| map_write_error(e, input.slug.as_deref()))?
        .map(Post::try_from)
        .transpose()
    }

    async fn delete(&self, id: PostId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
