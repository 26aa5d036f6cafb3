//! SMTP sender configuration handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use pressroom_common::types::SmtpConfigId;
use pressroom_storage::models::{CreateSmtpConfig, SmtpConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{require_admin, AppState, AuthContext};
use crate::error::{api_error, not_found, validation, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ListSmtpConfigsQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSmtpConfigRequest {
    pub is_active: bool,
}

/// Outcome of a connection test
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SmtpTestResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/v1/smtp-configs
pub async fn list_smtp_configs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSmtpConfigsQuery>,
) -> ApiResult<Json<Vec<SmtpConfig>>> {
    let configs = state
        .smtp_configs
        .list(query.active_only)
        .await
        .map_err(api_error)?;
    Ok(Json(configs))
}

/// POST /api/v1/smtp-configs
pub async fn create_smtp_config(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<CreateSmtpConfig>,
) -> ApiResult<(StatusCode, Json<SmtpConfig>)> {
    require_admin(&auth)?;

    if input.name.trim().is_empty() || input.host.trim().is_empty() {
        return Err(validation("Sender name and host are required"));
    }
    if !(1..=65535).contains(&input.port) {
        return Err(validation(format!("Invalid SMTP port: {}", input.port)));
    }
    if !input.from_email.contains('@') {
        return Err(validation("A valid from address is required"));
    }

    let config = state.smtp_configs.create(input).await.map_err(api_error)?;
    info!(smtp_config_id = %config.id, host = %config.host, "Created SMTP configuration");

    Ok((StatusCode::CREATED, Json(config)))
}

/// Toggle a sender on or off
///
/// PUT /api/v1/smtp-configs/:id
pub async fn update_smtp_config(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<SmtpConfigId>,
    Json(input): Json<UpdateSmtpConfigRequest>,
) -> ApiResult<Json<SmtpConfig>> {
    require_admin(&auth)?;
    state
        .smtp_configs
        .set_active(id, input.is_active)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("SMTP configuration"))
}

/// DELETE /api/v1/smtp-configs/:id
pub async fn delete_smtp_config(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<SmtpConfigId>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;
    if !state.smtp_configs.delete(id).await.map_err(api_error)? {
        return Err(not_found("SMTP configuration"));
    }
    info!(smtp_config_id = %id, "Deleted SMTP configuration");
    Ok(StatusCode::NO_CONTENT)
}

/// Open a connection with the stored settings
///
/// POST /api/v1/smtp-configs/:id/test
#[utoipa::path(
    post,
    path = "/api/v1/smtp-configs/{id}/test",
    tag = "smtp",
    params(("id" = uuid::Uuid, Path, description = "SMTP configuration ID")),
    responses(
        (status = 200, description = "Connection succeeded", body = SmtpTestResponse),
        (status = 502, description = "Connection failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn test_smtp_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SmtpConfigId>,
) -> ApiResult<Json<SmtpTestResponse>> {
    let config = state
        .smtp_configs
        .get(id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| not_found("SMTP configuration"))?;

    state.smtp_tester.test(&config).await.map_err(api_error)?;

    Ok(Json(SmtpTestResponse {
        success: true,
        message: format!("Connected to {}:{}", config.host, config.port),
    }))
}
