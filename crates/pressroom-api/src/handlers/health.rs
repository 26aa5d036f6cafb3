//! Liveness, readiness and dependency status for load balancers and
//! operators. None of these routes require a token.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use pressroom_storage::DatabasePool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::AppState;

/// Dependency check behind the readiness endpoints
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> pressroom_common::Result<()>;
}

#[async_trait]
impl HealthProbe for DatabasePool {
    async fn check(&self) -> pressroom_common::Result<()> {
        self.health_check().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailedHealthResponse {
    /// Unhealthy when any dependency check fails
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub send_queue: QueueHealth,
}

/// Outcome of one dependency check
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    /// Run `probe` and time it
    async fn measure(probe: &dyn HealthProbe) -> Self {
        let started = Instant::now();
        match probe.check().await {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)),
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Campaign sends still waiting for completion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueHealth {
    pub pending: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
    })
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is up"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 503 until the database answers
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready for traffic"),
        (status = 503, description = "Database unreachable")
    )
)]
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.health.check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Database check plus the number of sends in flight
#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses((status = 200, description = "Per-dependency status", body = DetailedHealthResponse))
)]
pub async fn health_detailed(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    let database = ComponentHealth::measure(state.health.as_ref()).await;

    Json(DetailedHealthResponse {
        status: database.status,
        checks: HealthChecks {
            database,
            send_queue: QueueHealth {
                pending: state.campaigns.tracker().pending_count(),
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProbe;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn failed_check_reports_error_without_latency() {
        let probe = FakeProbe::default();
        let up = serde_json::to_value(ComponentHealth::measure(&probe).await).unwrap();
        assert_eq!(up["status"], "healthy");
        assert!(up["latency_ms"].is_u64());
        assert!(up.get("error").is_none());

        probe.down.store(true, Ordering::SeqCst);
        let down = serde_json::to_value(ComponentHealth::measure(&probe).await).unwrap();
        assert_eq!(down["status"], "unhealthy");
        assert!(down.get("latency_ms").is_none());
        assert_eq!(down["error"], "Database error: connection refused");
    }
}
