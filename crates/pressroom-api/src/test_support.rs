//! Test application built on in-memory repositories

use async_trait::async_trait;
use axum_test::TestServer;
use pressroom_common::config::{AiConfig, AiEndpoints, StorageConfig};
use pressroom_common::types::UserRole;
use pressroom_common::{Error, Result};
use pressroom_core::test_support::{
    ChannelFeed, InMemoryAccessTokens, InMemoryCampaigns, InMemoryContacts, InMemoryPosts,
    InMemoryProfiles, InMemoryProviderKeys, InMemorySettings, InMemorySmtpConfigs,
};
use pressroom_core::{
    AiConfigResolver, CampaignManager, ContentGenerator, PostPublisher, SendTracker,
    SimulatedDelivery, SiteConfigState, SmtpTester, UploadService,
};
use pressroom_storage::repository::ProfileRepository;
use pressroom_storage::LocalStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::auth::{issue_token, AppState};
use crate::handlers::health::HealthProbe;
use crate::metrics::Metrics;
use crate::routes::{create_router, RouterOptions};

#[derive(Default)]
pub struct FakeProbe {
    pub down: AtomicBool,
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(Error::Database("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub campaigns: Arc<InMemoryCampaigns>,
    pub contacts: Arc<InMemoryContacts>,
    pub senders: Arc<InMemorySmtpConfigs>,
    pub posts: Arc<InMemoryPosts>,
    pub keys: Arc<InMemoryProviderKeys>,
    pub settings: Arc<InMemorySettings>,
    pub profiles: Arc<InMemoryProfiles>,
    pub tokens: Arc<InMemoryAccessTokens>,
    pub probe: Arc<FakeProbe>,
    _uploads_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let campaigns = Arc::new(InMemoryCampaigns::default());
        let contacts = Arc::new(InMemoryContacts::with(vec![
            ("ada@example.com", &["vip", "b2b"], true),
            ("bob@example.com", &["b2b"], true),
            ("cy@example.com", &["vip"], false),
        ]));
        let senders = Arc::new(InMemorySmtpConfigs::default());
        let posts = Arc::new(InMemoryPosts::default());
        let keys = Arc::new(InMemoryProviderKeys::default());
        let settings = Arc::new(InMemorySettings::default());
        let profiles = Arc::new(InMemoryProfiles::default());
        let tokens = Arc::new(InMemoryAccessTokens::default());
        let probe = Arc::new(FakeProbe::default());

        let tracker = Arc::new(SendTracker::new(
            campaigns.clone(),
            Arc::new(SimulatedDelivery::new(Duration::from_secs(60))),
        ));
        let manager = Arc::new(CampaignManager::new(
            campaigns.clone(),
            contacts.clone(),
            senders.clone(),
            tracker,
        ));

        let ai_config = AiConfig {
            endpoints: AiEndpoints::all("http://127.0.0.1:9"),
            ..AiConfig::default()
        };
        let resolver = Arc::new(AiConfigResolver::new(settings.clone(), keys.clone()));
        let generator = ContentGenerator::new(resolver, &ai_config).unwrap();

        let (feed, _changes) = ChannelFeed::new();
        let site = SiteConfigState::init(settings.clone(), Arc::new(feed)).await;

        let uploads_dir = TempDir::new().unwrap();
        let storage_config = StorageConfig {
            path: uploads_dir.path().to_path_buf(),
            bucket: "images".to_string(),
            public_base_url: "https://cdn.example.com".to_string(),
            max_upload_bytes: 1024,
        };
        let storage = Arc::new(LocalStorage::new(&storage_config).unwrap());

        let state = Arc::new(AppState {
            campaigns: manager,
            contacts: contacts.clone(),
            smtp_configs: senders.clone(),
            smtp_tester: SmtpTester::new(Duration::from_secs(2)),
            posts: posts.clone(),
            publisher: PostPublisher::new(posts.clone()),
            generator,
            provider_keys: keys.clone(),
            settings: settings.clone(),
            site,
            uploads: UploadService::new(storage, &storage_config),
            profiles: profiles.clone(),
            tokens: tokens.clone(),
            health: probe.clone(),
            metrics: Metrics::new().unwrap(),
        });

        let options = RouterOptions {
            enable_swagger: true,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: storage_config.max_upload_bytes,
        };
        let server = TestServer::new(create_router(state.clone(), &options)).unwrap();

        Self {
            server,
            state,
            campaigns,
            contacts,
            senders,
            posts,
            keys,
            settings,
            profiles,
            tokens,
            probe,
            _uploads_dir: uploads_dir,
        }
    }

    /// Create a profile with `role` and return a bearer token for it
    pub async fn token(&self, role: UserRole) -> String {
        let email = format!("{}@example.com", uuid::Uuid::new_v4().simple());
        let profile = self.profiles.create(&email, None, role).await.unwrap();
        issue_token(self.tokens.as_ref(), profile.id, "test", None)
            .await
            .unwrap()
    }

    pub async fn admin_token(&self) -> String {
        self.token(UserRole::Admin).await
    }
}
