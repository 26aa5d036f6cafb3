//! AI content handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use pressroom_common::types::AiProvider;
use pressroom_core::ai::{image_prompt, AiKeys};
use pressroom_core::{GenerationError, GenerationMode, GenerationRequest};
use pressroom_storage::models::{Post, PostStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::{require_admin, AppState, AuthContext};
use crate::error::{api_error, validation, ApiResult, ErrorResponse};

/// Prefix marking a masked secret echoed back by a client
const MASK: &str = "****";

/// Generated article
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    /// Cleaned HTML
    pub content: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImageRequest {
    /// Article topic the illustration is for
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub url: String,
}

/// Request body for saving generated content as a post
#[derive(Debug, Deserialize)]
pub struct SavePostRequest {
    pub content: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default = "default_post_status")]
    pub status: PostStatus,
}

fn default_post_status() -> PostStatus {
    PostStatus::Draft
}

/// Masked view of the `ai_config` setting
#[derive(Debug, Serialize, Deserialize)]
pub struct AiSettingsResponse {
    pub keys: BTreeMap<String, String>,
    pub configured: Vec<AiProvider>,
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return MASK.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", MASK, tail)
}

fn masked_settings(keys: &AiKeys) -> AiSettingsResponse {
    let masked = AiProvider::ALL
        .into_iter()
        .filter_map(|p| keys.get(p).map(|k| (p.config_field().to_string(), mask(k))))
        .collect();
    AiSettingsResponse {
        keys: masked,
        configured: keys.configured(),
    }
}

/// Generate an article or news digest
///
/// POST /api/v1/ai/generate
#[utoipa::path(
    post,
    path = "/api/v1/ai/generate",
    tag = "ai",
    responses(
        (status = 200, description = "Generated HTML", body = GenerateResponse),
        (status = 422, description = "Empty topic or missing vendor key", body = ErrorResponse),
        (status = 502, description = "Vendor error, message passed through", body = ErrorResponse)
    )
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    if request.topic.trim().is_empty() {
        return Err(api_error(GenerationError::EmptyTopic));
    }
    let (provider, model) = state.generator.route(&request).map_err(api_error)?;

    match state.generator.generate(&request).await {
        Ok(content) => {
            state.metrics.record_generation(provider.as_str(), true);
            Ok(Json(GenerateResponse {
                content,
                provider: provider.to_string(),
                model,
            }))
        }
        Err(e) => {
            warn!(provider = %provider, "Generation failed: {}", e);
            state.metrics.record_generation(provider.as_str(), false);
            Err(api_error(e))
        }
    }
}

/// Generate a featured image for a topic
///
/// POST /api/v1/ai/image
#[utoipa::path(
    post,
    path = "/api/v1/ai/image",
    tag = "ai",
    responses(
        (status = 200, description = "Image URL", body = ImageResponse),
        (status = 502, description = "Vendor error", body = ErrorResponse)
    )
)]
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageRequest>,
) -> ApiResult<Json<ImageResponse>> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(validation("Please enter a topic"));
    }

    let url = state
        .generator
        .generate_image(&image_prompt(topic))
        .await
        .map_err(api_error)?;
    Ok(Json(ImageResponse { url }))
}

/// Save generated HTML as a post authored by the caller
///
/// POST /api/v1/ai/posts
pub async fn save_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SavePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state
        .publisher
        .save_post(
            Some(auth.profile_id),
            &request.content,
            &request.topic,
            request.mode,
            request.status,
        )
        .await
        .map_err(api_error)?;
    state.metrics.record_post_saved();
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/v1/ai/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AiSettingsResponse>> {
    require_admin(&auth)?;
    let keys = state
        .generator
        .resolver()
        .load_base_config()
        .await
        .map_err(api_error)?;
    Ok(Json(masked_settings(&keys)))
}

/// Replace the base AI configuration. Masked values sent back unchanged
/// keep the stored key, and stored fields the client omits are kept.
///
/// PUT /api/v1/ai/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(mut incoming): Json<AiKeys>,
) -> ApiResult<Json<AiSettingsResponse>> {
    require_admin(&auth)?;
    let resolver = state.generator.resolver();
    let current = resolver.load_base_config().await.map_err(api_error)?;

    for provider in AiProvider::ALL {
        if incoming.get(provider).is_some_and(|k| k.starts_with(MASK)) {
            incoming.set(provider, current.get(provider).map(str::to_string));
        }
    }
    for (field, value) in current.extra {
        incoming.extra.entry(field).or_insert(value);
    }

    resolver.save_base_config(&incoming).await.map_err(api_error)?;
    info!(profile_id = %auth.profile_id, "AI settings updated");

    Ok(Json(masked_settings(&incoming)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_masked() {
        let mut keys = AiKeys::default();
        keys.set(AiProvider::OpenAi, Some("sk-live-123456".to_string()));
        keys.set(AiProvider::Groq, Some("   ".to_string()));

        let view = masked_settings(&keys);
        assert_eq!(view.keys.get("openai_key").map(String::as_str), Some("****3456"));
        assert!(!view.keys.contains_key("groq_key"));
        assert_eq!(view.configured, vec![AiProvider::OpenAi]);
    }
}
