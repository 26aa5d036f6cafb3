//! OpenAPI documentation
//!
//! Serves the generated OpenAPI document and Swagger UI for the Pressroom API.

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::handlers::{ai, api_keys, campaigns, health, settings, smtp_configs, uploads};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pressroom API",
        version = "1.0.0",
        description = "Back office API for campaigns, contacts, posts and AI content.\n\n\
            ## Authentication\n\n\
            Every `/api/v1` endpoint requires an access token.\n\n\
            - **Bearer**: `Authorization: Bearer <token>`\n\
            - **Header**: `X-API-Key: <token>`"
    ),
    paths(
        health::health,
        health::liveness,
        health::readiness,
        health::health_detailed,
        campaigns::list_campaigns,
        campaigns::create_campaign,
        campaigns::send_campaign,
        campaigns::delete_campaign,
        smtp_configs::test_smtp_config,
        ai::generate,
        ai::generate_image,
        settings::get_site_config,
        uploads::upload_image,
    ),
    components(schemas(
        ErrorResponse,
        health::HealthResponse,
        health::DetailedHealthResponse,
        health::HealthChecks,
        health::ComponentHealth,
        health::QueueHealth,
        health::HealthStatus,
        campaigns::ScheduleCampaignRequest,
        campaigns::AudienceSizeRequest,
        campaigns::AudienceSizeResponse,
        campaigns::SenderOption,
        smtp_configs::UpdateSmtpConfigRequest,
        smtp_configs::SmtpTestResponse,
        ai::GenerateResponse,
        ai::ImageRequest,
        ai::ImageResponse,
        api_keys::ProviderKeyResponse,
        api_keys::UpdateProviderKeyRequest,
        uploads::UploadResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "campaigns", description = "Campaign lifecycle"),
        (name = "smtp", description = "Sender configuration"),
        (name = "ai", description = "AI content generation"),
        (name = "settings", description = "Site configuration"),
        (name = "uploads", description = "Image uploads")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

/// Create OpenAPI routes: the JSON document and Swagger UI
pub fn create_openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_documented_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();

        for path in [
            "/health",
            "/health/ready",
            "/api/v1/campaigns",
            "/api/v1/campaigns/{id}/send",
            "/api/v1/ai/generate",
            "/api/v1/uploads",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(json["components"]["securitySchemes"]["bearer"].is_object());
    }
}
