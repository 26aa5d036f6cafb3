//! Campaign handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pressroom_common::types::CampaignId;
use pressroom_core::campaign::{WizardStep, WizardSummary};
use pressroom_core::{CampaignAction, CampaignDraft, CampaignWizard, TransitionOutcome};
use pressroom_storage::models::{Campaign, SmtpConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{AppState, AuthContext};
use crate::error::{api_error, validation, ApiResult, ErrorResponse};

/// Request body for scheduling a campaign
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ScheduleCampaignRequest {
    /// Defaults to 24 hours from now
    pub date: Option<DateTime<Utc>>,
}

/// Query parameters for deleting a campaign
#[derive(Debug, Deserialize)]
pub struct DeleteCampaignQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AudienceSizeRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AudienceSizeResponse {
    pub count: i64,
}

/// Sender choice offered by the creation wizard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SenderOption {
    pub id: uuid::Uuid,
    pub name: String,
    pub from_email: String,
}

impl From<SmtpConfig> for SenderOption {
    fn from(config: SmtpConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            from_email: config.from_email,
        }
    }
}

/// Review step of the creation wizard
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub step: WizardStep,
    pub summary: WizardSummary,
    pub audience_size: i64,
}

/// List campaigns, newest first
///
/// GET /api/v1/campaigns
#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    tag = "campaigns",
    responses((status = 200, description = "Campaigns, newest first"))
)]
pub async fn list_campaigns(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Campaign>>> {
    let campaigns = state.campaigns.list().await.map_err(api_error)?;
    Ok(Json(campaigns))
}

/// Walk a draft through every wizard step and return the review summary
///
/// POST /api/v1/campaigns/review
pub async fn review_campaign(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<CampaignDraft>,
) -> ApiResult<Json<ReviewResponse>> {
    let mut wizard = CampaignWizard::from_draft(draft);
    let step = wizard.advance_to(WizardStep::Review).map_err(api_error)?;
    let summary = wizard.summary();
    let audience_size = state
        .campaigns
        .audience_size(&wizard.draft().target_tags)
        .await
        .map_err(api_error)?;

    Ok(Json(ReviewResponse {
        step,
        summary,
        audience_size,
    }))
}

/// Create a draft campaign
///
/// POST /api/v1/campaigns
#[utoipa::path(
    post,
    path = "/api/v1/campaigns",
    tag = "campaigns",
    responses(
        (status = 201, description = "Campaign created as a draft"),
        (status = 422, description = "Invalid draft or inactive sender", body = ErrorResponse)
    )
)]
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(draft): Json<CampaignDraft>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let mut wizard = CampaignWizard::from_draft(draft);
    wizard.advance_to(WizardStep::Review).map_err(api_error)?;
    let campaign = wizard.finish(&state.campaigns).await.map_err(api_error)?;

    info!(campaign_id = %campaign.id, profile_id = %auth.profile_id, "Created campaign");

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Get a campaign by ID
///
/// GET /api/v1/campaigns/:id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Json<Campaign>> {
    let campaign = state.campaigns.get(id).await.map_err(api_error)?;
    Ok(Json(campaign))
}

async fn apply(
    state: &AppState,
    id: CampaignId,
    action: CampaignAction,
    date: Option<DateTime<Utc>>,
) -> ApiResult<TransitionOutcome> {
    let outcome = state
        .campaigns
        .transition(id, action, date)
        .await
        .map_err(api_error)?;
    state.metrics.record_transition(&action.to_string());
    Ok(outcome)
}

fn updated(outcome: TransitionOutcome) -> Response {
    match outcome {
        TransitionOutcome::Updated(campaign) => Json(campaign).into_response(),
        TransitionOutcome::Deleted(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Start sending a draft or paused campaign
///
/// POST /api/v1/campaigns/:id/send
#[utoipa::path(
    post,
    path = "/api/v1/campaigns/{id}/send",
    tag = "campaigns",
    params(("id" = uuid::Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign is sending"),
        (status = 409, description = "Not allowed from the current status", body = ErrorResponse)
    )
)]
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    apply(&state, id, CampaignAction::Send, None).await.map(updated)
}

/// Schedule a draft campaign
///
/// POST /api/v1/campaigns/:id/schedule
pub async fn schedule_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
    body: Option<Json<ScheduleCampaignRequest>>,
) -> ApiResult<Response> {
    let date = body.and_then(|Json(req)| req.date);
    apply(&state, id, CampaignAction::Schedule, date)
        .await
        .map(updated)
}

/// Pause a sending or scheduled campaign
///
/// POST /api/v1/campaigns/:id/pause
pub async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    apply(&state, id, CampaignAction::Pause, None).await.map(updated)
}

/// Stop a campaign
///
/// POST /api/v1/campaigns/:id/stop
pub async fn stop_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    apply(&state, id, CampaignAction::Stop, None).await.map(updated)
}

/// Delete a campaign. Requires `?confirm=true`.
///
/// DELETE /api/v1/campaigns/:id
#[utoipa::path(
    delete,
    path = "/api/v1/campaigns/{id}",
    tag = "campaigns",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign ID"),
        ("confirm" = bool, Query, description = "Must be true")
    ),
    responses(
        (status = 204, description = "Campaign deleted"),
        (status = 422, description = "Deletion not confirmed", body = ErrorResponse)
    )
)]
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
    Query(query): Query<DeleteCampaignQuery>,
) -> ApiResult<Response> {
    if !query.confirm {
        return Err(validation("Deleting a campaign must be confirmed"));
    }
    apply(&state, id, CampaignAction::Delete, None)
        .await
        .map(updated)
}

/// Distinct contact tags for audience selection
///
/// GET /api/v1/campaigns/audience/tags
pub async fn audience_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let tags = state.campaigns.available_tags().await.map_err(api_error)?;
    Ok(Json(tags))
}

/// Count the subscribed contacts an audience reaches
///
/// POST /api/v1/campaigns/audience/size
pub async fn audience_size(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AudienceSizeRequest>,
) -> ApiResult<Json<AudienceSizeResponse>> {
    let count = state
        .campaigns
        .audience_size(&req.tags)
        .await
        .map_err(api_error)?;
    Ok(Json(AudienceSizeResponse { count }))
}

/// Active senders
///
/// GET /api/v1/campaigns/senders
pub async fn sender_options(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SenderOption>>> {
    let senders = state.campaigns.sender_options().await.map_err(api_error)?;
    Ok(Json(senders.into_iter().map(SenderOption::from).collect()))
}
