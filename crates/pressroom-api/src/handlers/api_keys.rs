//! Vendor API key handlers. Secrets never leave the server unmasked.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pressroom_common::types::{AiProvider, ProviderKeyId};
use pressroom_storage::models::{NewProviderKey, ProviderKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{require_admin, AppState, AuthContext};
use crate::error::{api_error, not_found, validation, ApiResult};

/// Provider key as shown to clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderKeyResponse {
    pub id: uuid::Uuid,
    pub provider: String,
    pub name: String,
    /// Last four characters only
    pub key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderKey> for ProviderKeyResponse {
    fn from(k: ProviderKey) -> Self {
        Self {
            key: k.masked_key(),
            id: k.id,
            provider: k.provider,
            name: k.name,
            is_active: k.is_active,
            created_at: k.created_at,
            updated_at: k.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProviderKeyRequest {
    pub is_active: bool,
}

/// GET /api/v1/api-keys
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProviderKeyResponse>>> {
    require_admin(&auth)?;
    let keys = state.provider_keys.list().await.map_err(api_error)?;
    Ok(Json(keys.into_iter().map(ProviderKeyResponse::from).collect()))
}

/// POST /api/v1/api-keys
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(mut input): Json<NewProviderKey>,
) -> ApiResult<(StatusCode, Json<ProviderKeyResponse>)> {
    require_admin(&auth)?;

    let provider: AiProvider = input.provider.trim().parse().map_err(api_error)?;
    input.provider = provider.as_str().to_string();
    input.key = input.key.trim().to_string();
    if input.key.is_empty() {
        return Err(validation("API key cannot be empty"));
    }
    if input.name.trim().is_empty() {
        input.name = format!("{} key", provider);
    }

    let key = state.provider_keys.create(input).await.map_err(api_error)?;
    info!(key_id = %key.id, provider = %key.provider, "Created provider key");

    Ok((StatusCode::CREATED, Json(ProviderKeyResponse::from(key))))
}

/// Toggle a key on or off
///
/// PUT /api/v1/api-keys/:id
pub async fn update_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<ProviderKeyId>,
    Json(input): Json<UpdateProviderKeyRequest>,
) -> ApiResult<Json<ProviderKeyResponse>> {
    require_admin(&auth)?;
    state
        .provider_keys
        .set_active(id, input.is_active)
        .await
        .map_err(api_error)?
        .map(|k| Json(ProviderKeyResponse::from(k)))
        .ok_or_else(|| not_found("API key"))
}

/// DELETE /api/v1/api-keys/:id
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<ProviderKeyId>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;
    if !state.provider_keys.delete(id).await.map_err(api_error)? {
        return Err(not_found("API key"));
    }
    info!(key_id = %id, "Deleted provider key");
    Ok(StatusCode::NO_CONTENT)
}
