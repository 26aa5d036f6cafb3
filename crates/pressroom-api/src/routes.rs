//! API routes

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use pressroom_common::config::ApiConfig;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{auth_middleware, AppState};
use crate::handlers::{
    ai, api_keys, campaigns, contacts, health, posts, settings, smtp_configs, uploads,
};
use crate::metrics::metrics_handler;
use crate::openapi::create_openapi_routes;

/// Router options taken from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub enable_swagger: bool,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl RouterOptions {
    pub fn new(api: &ApiConfig, max_upload_bytes: usize) -> Self {
        Self {
            enable_swagger: api.enable_swagger,
            cors_origins: api.cors_origins.clone(),
            max_upload_bytes,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::health_detailed));

    let campaign_routes = Router::new()
        .route(
            "/",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route("/review", post(campaigns::review_campaign))
        .route("/audience/tags", get(campaigns::audience_tags))
        .route("/audience/size", post(campaigns::audience_size))
        .route("/senders", get(campaigns::sender_options))
        .route(
            "/:id",
            get(campaigns::get_campaign).delete(campaigns::delete_campaign),
        )
        .route("/:id/send", post(campaigns::send_campaign))
        .route("/:id/schedule", post(campaigns::schedule_campaign))
        .route("/:id/pause", post(campaigns::pause_campaign))
        .route("/:id/stop", post(campaigns::stop_campaign));

    let contact_routes = Router::new()
        .route(
            "/",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/tags", get(contacts::list_tags))
        .route(
            "/:id",
            put(contacts::update_contact).delete(contacts::delete_contact),
        );

    let smtp_routes = Router::new()
        .route(
            "/",
            get(smtp_configs::list_smtp_configs).post(smtp_configs::create_smtp_config),
        )
        .route(
            "/:id",
            put(smtp_configs::update_smtp_config).delete(smtp_configs::delete_smtp_config),
        )
        .route("/:id/test", post(smtp_configs::test_smtp_config));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        );

    let ai_routes = Router::new()
        .route("/generate", post(ai::generate))
        .route("/image", post(ai::generate_image))
        .route("/posts", post(ai::save_post))
        .route(
            "/settings",
            get(ai::get_settings).put(ai::update_settings),
        );

    let api_key_routes = Router::new()
        .route("/", get(api_keys::list_keys).post(api_keys::create_key))
        .route(
            "/:id",
            put(api_keys::update_key).delete(api_keys::delete_key),
        );

    let upload_routes = Router::new().route("/", post(uploads::upload_image)).layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(options.max_upload_bytes)),
    );

    // API v1 routes with authentication
    let api_v1 = Router::new()
        .nest("/campaigns", campaign_routes)
        .nest("/contacts", contact_routes)
        .nest("/smtp-configs", smtp_routes)
        .nest("/posts", post_routes)
        .nest("/ai", ai_routes)
        .nest("/api-keys", api_key_routes)
        .nest("/uploads", upload_routes)
        .route("/site-config", get(settings::get_site_config))
        .route("/settings/:key", put(settings::put_setting))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let mut router = Router::new()
        .nest("/health", health_routes)
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api_v1);

    if options.enable_swagger {
        router = router.merge(create_openapi_routes());
    }

    router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&options.cors_origins)),
    )
}

#[cfg(test)]
mod tests {
    use crate::auth::generate_token;
    use crate::test_support::TestApp;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use chrono::{Duration, Utc};
    use pressroom_common::types::UserRole;
    use pressroom_core::test_support::campaign_with_status;
    use pressroom_storage::models::{CampaignStatus, Post, PostStatus};
    use pressroom_storage::repository::{AccessTokenRepository, ProfileRepository};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;

    fn bearer(token: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }

    fn draft(sender: uuid::Uuid) -> Value {
        json!({
            "name": "Spring promo",
            "subject": "Deals inside",
            "smtp_config_id": sender,
            "content": "<p>Hello {{first_name}}, big deals this week.</p>",
            "target_tags": ["vip"]
        })
    }

    #[tokio::test]
    async fn health_routes_skip_auth() {
        let app = TestApp::new().await;

        app.server.get("/health").await.assert_status_ok();
        app.server.get("/health/live").await.assert_status_ok();
        app.server.get("/health/ready").await.assert_status_ok();

        app.probe.down.store(true, Ordering::SeqCst);
        app.server
            .get("/health/ready")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let detailed: Value = app.server.get("/health/detailed").await.json();
        assert_eq!(detailed["status"], "unhealthy");
        assert_eq!(detailed["checks"]["database"]["error"], "Database error: connection refused");
        assert_eq!(detailed["checks"]["send_queue"]["pending"], 0);
    }

    #[tokio::test]
    async fn api_requires_a_valid_token() {
        let app = TestApp::new().await;

        let response = app.server.get("/api/v1/campaigns").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "UNAUTHORIZED");

        let (name, value) = bearer("pr_0000000000000000");
        app.server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let token = app.token(UserRole::Editor).await;
        let (name, value) = bearer(&token);
        app.server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await
            .assert_status_ok();

        app.server
            .get("/api/v1/campaigns")
            .add_header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_str(&token).unwrap(),
            )
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn plain_users_and_expired_tokens_are_rejected() {
        let app = TestApp::new().await;

        let user_token = app.token(UserRole::User).await;
        let (name, value) = bearer(&user_token);
        app.server
            .get("/api/v1/posts")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let profile = app
            .profiles
            .create("late@example.com", None, UserRole::Admin)
            .await
            .unwrap();
        let generated = generate_token().unwrap();
        app.tokens
            .create(
                profile.id,
                "expired",
                &generated.hash,
                &generated.prefix,
                Some(Utc::now() - Duration::hours(1)),
            )
            .await
            .unwrap();
        let (name, value) = bearer(&generated.secret);
        let response = app.server.get("/api/v1/posts").add_header(name, value).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Access token has expired");
    }

    #[tokio::test]
    async fn campaign_lifecycle_over_http() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;
        let sender = app.senders.add("Newsroom", true);

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/campaigns")
            .add_header(name, value)
            .json(&draft(sender.id))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["status"], "draft");
        let id = created["id"].as_str().unwrap().to_string();

        // Pausing a draft is not allowed and writes nothing
        let (name, value) = bearer(&token);
        let response = app
            .server
            .post(&format!("/api/v1/campaigns/{}/pause", id))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "INVALID_TRANSITION");

        let (name, value) = bearer(&token);
        let sent: Value = app
            .server
            .post(&format!("/api/v1/campaigns/{}/send", id))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(sent["status"], "sending");
        assert_eq!(app.state.campaigns.tracker().pending_count(), 1);

        let (name, value) = bearer(&token);
        let stopped: Value = app
            .server
            .post(&format!("/api/v1/campaigns/{}/stop", id))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(stopped["status"], "stopped");
        assert_eq!(app.state.campaigns.tracker().pending_count(), 0);

        let metrics = app.server.get("/metrics").await.text();
        assert!(metrics.contains("pressroom_campaign_transitions_total{action=\"send\"} 1"));
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Admin).await;
        let inactive = app.senders.add("Old relay", false);

        let mut short = draft(inactive.id);
        short["content"] = json!("<p>Hi</p>");
        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/campaigns")
            .add_header(name, value)
            .json(&short)
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["message"], "Please add some content to your email");

        let (name, value) = bearer(&token);
        app.server
            .post("/api/v1/campaigns")
            .add_header(name, value)
            .json(&draft(inactive.id))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let (name, value) = bearer(&token);
        let list: Vec<Value> = app
            .server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await
            .json();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let app = TestApp::new().await;
        let token = app.admin_token().await;
        let campaign = campaign_with_status(CampaignStatus::Sent);
        app.campaigns.insert(campaign.clone());
        let path = format!("/api/v1/campaigns/{}", campaign.id);

        let (name, value) = bearer(&token);
        app.server
            .delete(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(app.campaigns.row(campaign.id).is_some());

        let (name, value) = bearer(&token);
        app.server
            .delete(&format!("{}?confirm=true", path))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(app.campaigns.row(campaign.id).is_none());

        let (name, value) = bearer(&token);
        app.server
            .get(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audience_helpers() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;
        let sender = app.senders.add("Newsroom", true);

        let (name, value) = bearer(&token);
        let tags: Vec<String> = app
            .server
            .get("/api/v1/campaigns/audience/tags")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(tags, vec!["b2b".to_string(), "vip".to_string()]);

        let (name, value) = bearer(&token);
        let size: Value = app
            .server
            .post("/api/v1/campaigns/audience/size")
            .add_header(name, value)
            .json(&json!({ "tags": ["vip"] }))
            .await
            .json();
        assert_eq!(size["count"], 1);

        let mut everyone = draft(sender.id);
        everyone["target_tags"] = json!([]);
        let (name, value) = bearer(&token);
        let review: Value = app
            .server
            .post("/api/v1/campaigns/review")
            .add_header(name, value)
            .json(&everyone)
            .await
            .json();
        assert_eq!(review["step"], "review");
        assert_eq!(review["summary"]["audience"], Value::Null);
        assert_eq!(review["audience_size"], 2);

        let (name, value) = bearer(&token);
        let senders: Vec<Value> = app
            .server
            .get("/api/v1/campaigns/senders")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(senders.len(), 1);
        assert!(senders[0].get("password").is_none());
    }

    #[tokio::test]
    async fn generation_without_key_makes_no_vendor_call() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/ai/generate")
            .add_header(name, value)
            .json(&json!({ "topic": "Solar roofs", "model": "claude-3-5-sonnet" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["error"], "MISSING_API_KEY");
        assert!(body["message"].as_str().unwrap().contains("anthropic"));

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/ai/generate")
            .add_header(name, value)
            .json(&json!({ "topic": "   " }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["message"], "Please enter a topic");

        let metrics = app.server.get("/metrics").await.text();
        assert!(metrics.contains(
            "pressroom_ai_generations_total{outcome=\"error\",provider=\"anthropic\"} 1"
        ));
    }

    #[tokio::test]
    async fn generated_content_is_saved_as_post() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/ai/posts")
            .add_header(name, value)
            .json(&json!({
                "content": "<h1 class=\"title\">Solar <em>Roofs</em> Explained</h1><p>Body</p>",
                "topic": "solar roofs",
                "status": "published"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let post: Post = response.json();
        assert_eq!(post.title, "Solar Roofs Explained");
        assert!(post.slug.starts_with("solar-roofs-explained-"));
        assert_eq!(post.status, PostStatus::Published);
        assert!(post.author_id.is_some());
        assert_eq!(app.posts.all().len(), 1);

        let (name, value) = bearer(&token);
        app.server
            .post("/api/v1/ai/posts")
            .add_header(name, value)
            .json(&json!({ "content": "  " }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn provider_keys_are_admin_only_and_masked() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        let editor = app.token(UserRole::Editor).await;

        let (name, value) = bearer(&editor);
        app.server
            .get("/api/v1/api-keys")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (name, value) = bearer(&admin);
        let response = app
            .server
            .post("/api/v1/api-keys")
            .add_header(name, value)
            .json(&json!({ "provider": "openai", "name": "", "key": " sk-live-abcd1234 " }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["key"], "****1234");
        assert_eq!(created["name"], "openai key");

        let (name, value) = bearer(&admin);
        app.server
            .post("/api/v1/api-keys")
            .add_header(name, value)
            .json(&json!({ "provider": "cohere", "name": "x", "key": "abc" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let key = app
            .state
            .generator
            .resolver()
            .resolve_key(pressroom_common::types::AiProvider::OpenAi)
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("sk-live-abcd1234"));
    }

    #[tokio::test]
    async fn masked_ai_settings_keep_stored_keys() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        let (name, value) = bearer(&admin);
        app.server
            .put("/api/v1/ai/settings")
            .add_header(name, value)
            .json(&json!({
                "openai_key": "sk-original-9999",
                "groq_key": "gsk-1111",
                "default_tone": "friendly"
            }))
            .await
            .assert_status_ok();

        let (name, value) = bearer(&admin);
        let view: Value = app
            .server
            .put("/api/v1/ai/settings")
            .add_header(name, value)
            .json(&json!({ "openai_key": "****9999", "groq_key": "gsk-2222" }))
            .await
            .json();
        assert_eq!(view["keys"]["openai_key"], "****9999");
        assert_eq!(view["keys"]["groq_key"], "****2222");

        let stored = app
            .state
            .generator
            .resolver()
            .load_base_config()
            .await
            .unwrap();
        assert_eq!(stored.openai_key.as_deref(), Some("sk-original-9999"));
        assert_eq!(stored.groq_key.as_deref(), Some("gsk-2222"));
        assert_eq!(stored.extra.get("default_tone"), Some(&json!("friendly")));
    }

    #[tokio::test]
    async fn settings_update_is_visible_in_site_config() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        let (name, value) = bearer(&admin);
        let before: Value = app
            .server
            .get("/api/v1/site-config")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(before["theme"], Value::Null);
        assert_eq!(before["menu_items"].as_array().unwrap().len(), 16);

        let (name, value) = bearer(&admin);
        app.server
            .put("/api/v1/settings/theme")
            .add_header(name, value)
            .json(&json!({ "primary": "#0f172a", "font": "Inter" }))
            .await
            .assert_status_ok();

        let (name, value) = bearer(&admin);
        let after: Value = app
            .server
            .get("/api/v1/site-config")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(after["theme"]["primary"], "#0f172a");
        assert_eq!(after["theme"]["font"], "Inter");

        let (name, value) = bearer(&admin);
        app.server
            .put("/api/v1/settings/ai_config")
            .add_header(name, value)
            .json(&json!({ "openai_key": "sk-sneaky" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn uploads_store_images_only() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/uploads?filename=hero.png")
            .add_header(name, value)
            .bytes(vec![0x89, b'P', b'N', b'G'].into())
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert!(body["url"]
            .as_str()
            .unwrap()
            .starts_with("https://cdn.example.com/images/"));

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/uploads?filename=notes.txt")
            .add_header(name, value)
            .bytes(b"plain text".to_vec().into())
            .await;
        let body: Value = response.json();
        assert_eq!(body["error"], "UPLOAD_ERROR");
    }

    #[tokio::test]
    async fn contacts_crud() {
        let app = TestApp::new().await;
        let token = app.token(UserRole::Editor).await;

        let (name, value) = bearer(&token);
        let response = app
            .server
            .post("/api/v1/contacts")
            .add_header(name, value)
            .json(&json!({ "email": " Dee@Example.com ", "tags": ["news", " news "] }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let contact: Value = response.json();
        assert_eq!(contact["email"], "dee@example.com");
        assert_eq!(contact["tags"], json!(["news"]));
        assert_eq!(contact["is_subscribed"], true);

        let (name, value) = bearer(&token);
        let filtered: Vec<Value> = app
            .server
            .get("/api/v1/contacts?tag=news")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(filtered.len(), 1);

        let (name, value) = bearer(&token);
        app.server
            .post("/api/v1/contacts")
            .add_header(name, value)
            .json(&json!({ "email": "not-an-email" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let path = format!("/api/v1/contacts/{}", contact["id"].as_str().unwrap());
        let (name, value) = bearer(&token);
        app.server
            .delete(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let (name, value) = bearer(&token);
        app.server
            .delete(&path)
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new().await;
        let doc: Value = app.server.get("/api-docs/openapi.json").await.json();
        assert_eq!(doc["info"]["title"], "Pressroom API");
    }
}
