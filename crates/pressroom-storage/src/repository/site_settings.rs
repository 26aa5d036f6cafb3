//! Site settings repository and change feed

use crate::db::DatabasePool;
use crate::models::SiteSetting;
use async_trait::async_trait;
use pressroom_common::{Error, Result};
use sqlx::postgres::PgListener;
use tracing::debug;

/// Channel the `site_settings` trigger notifies on
pub const SETTINGS_CHANNEL: &str = "site_settings_changed";

/// Change key meaning "anything may have changed"
pub const ANY_SETTING: &str = "*";

/// Site settings repository trait
#[async_trait]
pub trait SiteSettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn list(&self) -> Result<Vec<SiteSetting>>;

    /// Insert or replace a setting
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<SiteSetting>;
}

/// Database site settings repository
pub struct DbSiteSettingsRepository {
    pool: DatabasePool,
}

impl DbSiteSettingsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteSettingsRepository for DbSiteSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        sqlx::query_scalar::<_, serde_json::Value>("SELECT value FROM site_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<SiteSetting>> {
        sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, updated_at FROM site_settings ORDER BY key",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<SiteSetting> {
        sqlx::query_as::<_, SiteSetting>(
            r#"
            INSERT INTO site_settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}

/// Source of "setting changed" notifications
#[async_trait]
pub trait SettingsChangeFeed: Send + Sync {
    async fn subscribe(&self) -> Result<Box<dyn SettingsSubscription>>;
}

/// An open subscription; yields the key of each changed setting
#[async_trait]
pub trait SettingsSubscription: Send {
    /// Wait for the next change. `Ok(None)` means the feed has closed.
    async fn next_change(&mut self) -> Result<Option<String>>;
}

/// `LISTEN site_settings_changed` over a dedicated connection
pub struct PgSettingsFeed {
    pool: DatabasePool,
}

impl PgSettingsFeed {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsChangeFeed for PgSettingsFeed {
    async fn subscribe(&self) -> Result<Box<dyn SettingsSubscription>> {
        let mut listener = PgListener::connect_with(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("Failed to open listener: {}", e)))?;
        listener
            .listen(SETTINGS_CHANNEL)
            .await
            .map_err(|e| Error::Database(format!("Failed to LISTEN: {}", e)))?;

        debug!(channel = SETTINGS_CHANNEL, "Subscribed to settings changes");
        Ok(Box::new(PgSettingsSubscription { listener }))
    }
}

struct PgSettingsSubscription {
    listener: PgListener,
}

#[async_trait]
impl SettingsSubscription for PgSettingsSubscription {
    async fn next_change(&mut self) -> Result<Option<String>> {
        // None from try_recv means the connection dropped and notifications
        // may have been missed; report a wildcard change.
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(Some(notification.payload().to_string())),
            Ok(None) => {
                debug!("Settings listener reconnecting");
                Ok(Some(ANY_SETTING.to_string()))
            }
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }
}
