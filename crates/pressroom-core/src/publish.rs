//! Saving generated HTML as a blog post

use crate::ai::GenerationMode;
use chrono::Utc;
use once_cell::sync::Lazy;
use pressroom_common::types::ProfileId;
use pressroom_common::{Error, Result};
use pressroom_storage::models::{NewPost, Post, PostStatus};
use pressroom_storage::repository::PostRepository;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

const MAX_SLUG_BASE: usize = 50;

static H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Text of the first `<h1>` with inner tags removed
pub fn extract_title(html: &str) -> Option<String> {
    let inner = H1.captures(html)?.get(1)?.as_str();
    let title = TAG.replace_all(inner, "").trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Title fallback when the HTML has no usable heading
pub fn fallback_title(mode: GenerationMode, topic: &str) -> String {
    let topic = topic.trim();
    match mode {
        GenerationMode::Article if topic.is_empty() => "Untitled Post".to_string(),
        GenerationMode::Article => topic.to_string(),
        GenerationMode::News => format!("News: {}", topic),
    }
}

/// URL-safe slug body: lowercase `[a-z0-9]` runs joined by single hyphens,
/// at most 50 characters. Applying it to its own output changes nothing.
pub fn slug_base(title: &str) -> String {
    let lowered = title.to_lowercase();
    let dashed = NON_SLUG.replace_all(&lowered, "-");
    let trimmed = dashed.trim_matches('-');
    let cut = &trimmed[..trimmed.len().min(MAX_SLUG_BASE)];
    cut.trim_matches('-').to_string()
}

/// Slug with a four-digit suffix taken from the epoch millis
pub fn slugify(title: &str, epoch_millis: i64) -> String {
    let base = slug_base(title);
    let base = if base.is_empty() { "post" } else { base.as_str() };
    format!("{}-{:04}", base, epoch_millis.rem_euclid(10_000))
}

/// Persists generated content as posts
pub struct PostPublisher {
    posts: Arc<dyn PostRepository>,
}

impl PostPublisher {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Insert one post from generated HTML. Requires a signed-in actor.
    pub async fn save_post(
        &self,
        actor: Option<ProfileId>,
        html: &str,
        topic: &str,
        mode: GenerationMode,
        status: PostStatus,
    ) -> Result<Post> {
        let author_id = actor.ok_or_else(|| Error::Auth("Please login to save.".to_string()))?;

        if html.trim().is_empty() {
            return Err(Error::Validation("There is no content to save".to_string()));
        }

        let title = extract_title(html).unwrap_or_else(|| fallback_title(mode, topic));
        let slug = slugify(&title, Utc::now().timestamp_millis());

        let post = self
            .posts
            .create(NewPost {
                title,
                slug,
                content: html.to_string(),
                excerpt: None,
                featured_image: None,
                status,
                author_id: Some(author_id),
                seo_title: None,
                seo_description: None,
                seo_keywords: None,
            })
            .await?;

        info!(post_id = %post.id, slug = %post.slug, status = %post.status, "Post saved");
        Ok(post)
    }
}
