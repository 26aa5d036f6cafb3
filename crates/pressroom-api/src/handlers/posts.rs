//! Post handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use pressroom_common::types::{Page, PostId};
use pressroom_core::publish::slugify;
use pressroom_storage::models::{NewPost, Post, PostStatus, UpdatePost};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{AppState, AuthContext};
use crate::error::{api_error, not_found, validation, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub status: Option<PostStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Request body for creating a post by hand
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    /// Derived from the title when omitted
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    #[serde(default = "default_status")]
    pub status: PostStatus,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

fn default_status() -> PostStatus {
    PostStatus::Draft
}

/// GET /api/v1/posts
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let page = Page {
        limit: query.limit.clamp(1, 500),
        offset: query.offset.max(0),
    };
    let posts = state
        .posts
        .list(query.status, page)
        .await
        .map_err(api_error)?;
    Ok(Json(posts))
}

/// GET /api/v1/posts/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
) -> ApiResult<Json<Post>> {
    state
        .posts
        .get(id)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Post"))
}

/// POST /api/v1/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(validation("Post title is required"));
    }

    let slug = input
        .slug
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(&title, Utc::now().timestamp_millis()));

    let post = state
        .posts
        .create(NewPost {
            title,
            slug,
            content: input.content,
            excerpt: input.excerpt,
            featured_image: input.featured_image,
            status: input.status,
            author_id: Some(auth.profile_id),
            seo_title: input.seo_title,
            seo_description: input.seo_description,
            seo_keywords: input.seo_keywords,
        })
        .await
        .map_err(api_error)?;

    info!(post_id = %post.id, slug = %post.slug, "Created post");
    state.metrics.record_post_saved();

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/v1/posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
    Json(input): Json<UpdatePost>,
) -> ApiResult<Json<Post>> {
    if input.title.as_deref().map(str::trim) == Some("") {
        return Err(validation("Post title cannot be empty"));
    }
    state
        .posts
        .update(id, input)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Post"))
}

/// DELETE /api/v1/posts/:id
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    if !state.posts.delete(id).await.map_err(api_error)? {
        return Err(not_found("Post"));
    }
    info!(post_id = %id, "Deleted post");
    Ok(StatusCode::NO_CONTENT)
}
