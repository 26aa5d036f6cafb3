//! Pressroom API - REST API server
//!
//! This crate provides the REST API for the Pressroom back office:
//! token authentication, campaign lifecycle, contacts and senders, posts,
//! AI content generation, site settings and uploads.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod openapi;
pub mod routes;

#[cfg(test)]
mod test_support;

pub use auth::{issue_token, AppState, AuthContext};
pub use handlers::health::HealthProbe;
pub use metrics::Metrics;
pub use openapi::create_openapi_routes;
pub use routes::{create_router, RouterOptions};
