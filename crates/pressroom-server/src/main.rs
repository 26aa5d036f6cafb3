//! Pressroom - back office server entry point

use anyhow::{Context, Result};
use pressroom_api::{create_router, issue_token, AppState, Metrics, RouterOptions};
use pressroom_common::config::{AuthConfig, Config, LoggingConfig};
use pressroom_common::types::UserRole;
use pressroom_core::{
    AiConfigResolver, CampaignManager, ContentGenerator, PostPublisher, SendTracker,
    SimulatedDelivery, SiteConfigState, SmtpTester, UploadService,
};
use pressroom_storage::repository::{
    AccessTokenRepository, DbAccessTokenRepository, DbCampaignRepository, DbContactRepository,
    DbPostRepository, DbProfileRepository, DbProviderKeyRepository, DbSiteSettingsRepository,
    DbSmtpConfigRepository, PgSettingsFeed, ProfileRepository,
};
use pressroom_storage::{DatabasePool, LocalStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging);

    info!("Starting Pressroom server...");

    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    if config.database.run_migrations {
        db_pool.migrate().await?;
        info!("Database migrations completed");
    }

    let campaigns = Arc::new(DbCampaignRepository::new(db_pool.clone()));
    let contacts = Arc::new(DbContactRepository::new(db_pool.clone()));
    let smtp_configs = Arc::new(DbSmtpConfigRepository::new(db_pool.clone()));
    let posts = Arc::new(DbPostRepository::new(db_pool.clone()));
    let provider_keys = Arc::new(DbProviderKeyRepository::new(db_pool.clone()));
    let settings = Arc::new(DbSiteSettingsRepository::new(db_pool.clone()));
    let profiles = Arc::new(DbProfileRepository::new(db_pool.clone()));
    let tokens = Arc::new(DbAccessTokenRepository::new(db_pool.clone()));

    // Campaign sends
    let delivery = SimulatedDelivery::new(Duration::from_secs(config.campaigns.send_delay_secs));
    let tracker = Arc::new(SendTracker::new(campaigns.clone(), Arc::new(delivery)));
    let manager = Arc::new(CampaignManager::new(
        campaigns,
        contacts.clone(),
        smtp_configs.clone(),
        tracker.clone(),
    ));

    // AI content
    let resolver = Arc::new(AiConfigResolver::new(settings.clone(), provider_keys.clone()));
    let generator = ContentGenerator::new(resolver, &config.ai)?;

    let site = SiteConfigState::init(
        settings.clone(),
        Arc::new(PgSettingsFeed::new(db_pool.clone())),
    )
    .await;

    let file_storage = Arc::new(LocalStorage::new(&config.storage)?);
    let uploads = UploadService::new(file_storage, &config.storage);

    bootstrap_admin(&config.auth, profiles.as_ref(), tokens.as_ref()).await?;

    let state = Arc::new(AppState {
        campaigns: manager,
        contacts,
        smtp_configs,
        smtp_tester: SmtpTester::default(),
        posts: posts.clone(),
        publisher: PostPublisher::new(posts),
        generator,
        provider_keys,
        settings,
        site: site.clone(),
        uploads,
        profiles,
        tokens,
        health: Arc::new(db_pool.clone()),
        metrics: Metrics::new().context("Failed to register metrics")?,
    });

    let options = RouterOptions::new(&config.api, config.storage.max_upload_bytes);
    let app = create_router(state, &options);

    let addr = format!("{}:{}", config.server.bind_address, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining background work");
    tracker.shutdown().await;
    site.teardown().await;
    db_pool.close().await;

    info!("Pressroom server shutdown complete");

    Ok(())
}

/// Create the first admin profile and print its token once
async fn bootstrap_admin(
    auth: &AuthConfig,
    profiles: &dyn ProfileRepository,
    tokens: &dyn AccessTokenRepository,
) -> Result<()> {
    let Some(email) = auth.bootstrap_admin_email.as_deref() else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();
    if email.is_empty() || profiles.find_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let profile = profiles.create(&email, None, UserRole::Admin).await?;
    let token = issue_token(tokens, profile.id, "bootstrap", None).await?;
    warn!(
        email = %email,
        "Created admin profile; store this access token, it is not shown again: {}",
        token
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .init();
    }
}
