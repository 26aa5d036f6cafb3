//! Site configuration handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use pressroom_core::ai::AI_CONFIG_KEY;
use pressroom_core::SiteConfig;
use pressroom_storage::models::SiteSetting;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{require_admin, AppState, AuthContext};
use crate::error::{api_error, validation, ApiResult};

/// Current theme and admin menu
///
/// GET /api/v1/site-config
#[utoipa::path(
    get,
    path = "/api/v1/site-config",
    tag = "settings",
    responses((status = 200, description = "Theme and admin menu"))
)]
pub async fn get_site_config(State(state): State<Arc<AppState>>) -> Json<SiteConfig> {
    Json(state.site.snapshot().await)
}

/// Insert or replace one setting
///
/// PUT /api/v1/settings/:key
pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> ApiResult<Json<SiteSetting>> {
    require_admin(&auth)?;

    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(validation("Setting key is required"));
    }
    if key == AI_CONFIG_KEY {
        return Err(validation("Use /ai/settings to change the AI configuration"));
    }

    let setting = state.settings.put(&key, value).await.map_err(api_error)?;
    info!(key = %key, profile_id = %auth.profile_id, "Setting updated");

    // The change feed also triggers a reload; refresh now so the caller
    // reads its own write.
    if let Err(e) = state.site.refresh().await {
        warn!("Site configuration refresh failed: {}", e);
    }

    Ok(Json(setting))
}
