//! Prometheus metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use prometheus::{opts, Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;
use tracing::error;

use crate::auth::AppState;

/// Counters exported on `/metrics`
pub struct Metrics {
    registry: Registry,
    campaign_transitions: IntCounterVec,
    ai_generations: IntCounterVec,
    posts_saved: IntCounter,
    uploads: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("pressroom".to_string()), None)?;

        let campaign_transitions = IntCounterVec::new(
            opts!(
                "campaign_transitions_total",
                "Campaign lifecycle actions applied"
            ),
            &["action"],
        )?;
        let ai_generations = IntCounterVec::new(
            opts!("ai_generations_total", "AI generation requests by outcome"),
            &["provider", "outcome"],
        )?;
        let posts_saved = IntCounter::with_opts(opts!("posts_saved_total", "Posts saved"))?;
        let uploads = IntCounterVec::new(
            opts!("uploads_total", "Image uploads by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(campaign_transitions.clone()))?;
        registry.register(Box::new(ai_generations.clone()))?;
        registry.register(Box::new(posts_saved.clone()))?;
        registry.register(Box::new(uploads.clone()))?;

        Ok(Self {
            registry,
            campaign_transitions,
            ai_generations,
            posts_saved,
            uploads,
        })
    }

    pub fn record_transition(&self, action: &str) {
        self.campaign_transitions.with_label_values(&[action]).inc();
    }

    pub fn record_generation(&self, provider: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.ai_generations
            .with_label_values(&[provider, outcome])
            .inc();
    }

    pub fn record_post_saved(&self) {
        self.posts_saved.inc();
    }

    pub fn record_upload(&self, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.uploads.with_label_values(&[outcome]).inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                String::new(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("send");
        metrics.record_transition("send");
        metrics.record_generation("openai", false);

        let text = metrics.render().unwrap();
        assert!(text.contains("pressroom_campaign_transitions_total{action=\"send\"} 2"));
        assert!(text.contains(
            "pressroom_ai_generations_total{outcome=\"error\",provider=\"openai\"} 1"
        ));
    }

    #[test]
    fn registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_post_saved();
        assert!(second.render().unwrap().contains("pressroom_posts_saved_total 0"));
    }
}
