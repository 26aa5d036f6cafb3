//! Site configuration state
//!
//! Theme and admin menu loaded from `site_settings`, kept current by a
//! background task listening to the settings change feed.

use pressroom_common::Result;
use pressroom_storage::repository::{SettingsChangeFeed, SiteSettingsRepository};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const THEME_KEY: &str = "theme";
pub const ADMIN_MENU_KEY: &str = "admin_menu";

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary: String,
    pub secondary: String,
    pub radius: String,
    pub font: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub path: String,
    pub icon: String,
}

impl MenuItem {
    fn new(title: &str, path: &str, icon: &str) -> Self {
        Self {
            title: title.to_string(),
            path: path.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Admin navigation used when no menu is stored
pub fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("Dashboard", "/admin", "LayoutDashboard"),
        MenuItem::new("Providers", "/admin/networks", "Globe"),
        MenuItem::new("Blog Posts", "/admin/blog", "FileText"),
        MenuItem::new("Ads Manager", "/admin/ads", "Megaphone"),
        MenuItem::new("Ad Units", "/admin/ad-units", "LayoutTemplate"),
        MenuItem::new("Placements", "/admin/placements", "Monitor"),
        MenuItem::new("AI Writer", "/admin/ai-writer", "Bot"),
        MenuItem::new("News Scraper", "/admin/news-scraper", "Newspaper"),
        MenuItem::new("Contacts", "/admin/contacts", "Mail"),
        MenuItem::new("SEO", "/admin/seo", "Search"),
        MenuItem::new("API Keys", "/admin/api", "Settings"),
        MenuItem::new("Services", "/admin/services", "Zap"),
        MenuItem::new("Events", "/admin/events", "Calendar"),
        MenuItem::new("Cases", "/admin/cases", "Briefcase"),
        MenuItem::new("Education", "/admin/edu", "GraduationCap"),
        MenuItem::new("Offers", "/admin/offers", "Trophy"),
    ]
}

/// Point-in-time view of the site configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfig {
    pub theme: Option<ThemeConfig>,
    pub menu_items: Vec<MenuItem>,
    /// Successful reloads so far
    pub revision: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            theme: None,
            menu_items: default_menu(),
            revision: 0,
        }
    }
}

/// Shared site configuration with explicit lifecycle
pub struct SiteConfigState {
    store: Arc<dyn SiteSettingsRepository>,
    current: Arc<RwLock<SiteConfig>>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SiteConfigState {
    /// Load the configuration and start following changes. A failed first
    /// load leaves the defaults in place.
    pub async fn init(
        store: Arc<dyn SiteSettingsRepository>,
        feed: Arc<dyn SettingsChangeFeed>,
    ) -> Arc<Self> {
        let state = Arc::new(Self {
            store,
            current: Arc::new(RwLock::new(SiteConfig::default())),
            cancel: CancellationToken::new(),
            listener: Mutex::new(None),
        });

        if let Err(e) = state.refresh().await {
            warn!("Could not load site settings: {}", e);
        }

        let handle = tokio::spawn(listen(
            state.store.clone(),
            state.current.clone(),
            feed,
            state.cancel.clone(),
        ));
        if let Ok(mut listener) = state.listener.lock() {
            *listener = Some(handle);
        }

        info!("Site configuration initialized");
        state
    }

    /// Reload from the store now
    pub async fn refresh(&self) -> Result<()> {
        reload(self.store.as_ref(), &self.current).await
    }

    pub async fn snapshot(&self) -> SiteConfig {
        self.current.read().await.clone()
    }

    /// Stop following changes and wait for the listener to exit
    pub async fn teardown(&self) {
        self.cancel.cancel();
        let handle = self.listener.lock().ok().and_then(|mut l| l.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Settings listener ended abnormally: {}", e);
            }
        }
        debug!("Site configuration torn down");
    }
}

async fn reload(store: &dyn SiteSettingsRepository, current: &RwLock<SiteConfig>) -> Result<()> {
    let settings = store.list().await?;

    let mut theme = None;
    let mut menu = None;
    for setting in settings {
        match setting.key.as_str() {
            THEME_KEY => match serde_json::from_value::<ThemeConfig>(setting.value) {
                Ok(t) => theme = Some(t),
                Err(e) => warn!("Ignoring malformed theme setting: {}", e),
            },
            ADMIN_MENU_KEY => match serde_json::from_value::<Vec<MenuItem>>(setting.value) {
                Ok(items) if !items.is_empty() => menu = Some(items),
                Ok(_) => {}
                Err(e) => warn!("Ignoring malformed admin menu setting: {}", e),
            },
            _ => {}
        }
    }

    let mut config = current.write().await;
    config.theme = theme;
    config.menu_items = menu.unwrap_or_else(default_menu);
    config.revision += 1;
    Ok(())
}

async fn listen(
    store: Arc<dyn SiteSettingsRepository>,
    current: Arc<RwLock<SiteConfig>>,
    feed: Arc<dyn SettingsChangeFeed>,
    cancel: CancellationToken,
) {
    'subscribe: loop {
        let mut subscription = tokio::select! {
            _ = cancel.cancelled() => break,
            sub = feed.subscribe() => match sub {
                Ok(sub) => sub,
                Err(e) => {
                    warn!("Settings subscription failed: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => continue,
                    }
                }
            },
        };

        loop {
            let change = tokio::select! {
                _ = cancel.cancelled() => break 'subscribe,
                change = subscription.next_change() => change,
            };

            match change {
                Ok(Some(key)) => {
                    debug!(key = %key, "Settings changed, reloading");
                    if let Err(e) = reload(store.as_ref(), &current).await {
                        warn!("Settings reload failed: {}", e);
                    }
                }
                Ok(None) => {
                    info!("Settings change feed closed");
                    break 'subscribe;
                }
                Err(e) => {
                    warn!("Settings change feed error: {}", e);
                    continue 'subscribe;
                }
            }
        }
    }
    debug!("Settings listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ChannelFeed, InMemorySettings};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn wait_for_revision(state: &SiteConfigState, revision: u64) -> SiteConfig {
        for _ in 0..200 {
            let snapshot = state.snapshot().await;
            if snapshot.revision >= revision {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("revision {} never reached", revision);
    }

    #[test]
    fn test_default_menu_has_sixteen_entries() {
        let menu = default_menu();
        assert_eq!(menu.len(), 16);
        assert_eq!(menu[0].path, "/admin");
        assert_eq!(menu[15].title, "Offers");
    }

    #[tokio::test]
    async fn test_init_loads_theme_and_defaults() {
        let store = Arc::new(InMemorySettings::default());
        store
            .put(THEME_KEY, json!({ "primary": "#0f172a", "radius": "0.5rem" }))
            .await
            .unwrap();
        let (feed, _tx) = ChannelFeed::new();

        let state = SiteConfigState::init(store, Arc::new(feed)).await;
        let snapshot = state.snapshot().await;

        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.theme.unwrap().primary, "#0f172a");
        assert_eq!(snapshot.menu_items, default_menu());
        state.teardown().await;
    }

    #[tokio::test]
    async fn test_change_notification_triggers_reload() {
        let store = Arc::new(InMemorySettings::default());
        let (feed, tx) = ChannelFeed::new();
        let state = SiteConfigState::init(store.clone(), Arc::new(feed)).await;
        assert_eq!(state.snapshot().await.theme, None);

        store
            .put(
                ADMIN_MENU_KEY,
                json!([{ "title": "Home", "path": "/admin", "icon": "LayoutDashboard" }]),
            )
            .await
            .unwrap();
        tx.send(ADMIN_MENU_KEY.to_string()).unwrap();

        let snapshot = wait_for_revision(&state, 2).await;
        assert_eq!(snapshot.menu_items.len(), 1);
        assert_eq!(snapshot.menu_items[0].title, "Home");
        state.teardown().await;
    }

    #[tokio::test]
    async fn test_failed_load_keeps_defaults() {
        let store = Arc::new(InMemorySettings::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let (feed, _tx) = ChannelFeed::new();

        let state = SiteConfigState::init(store, Arc::new(feed)).await;
        assert_eq!(state.snapshot().await, SiteConfig::default());
        state.teardown().await;
    }

    #[tokio::test]
    async fn test_teardown_stops_listener() {
        let store = Arc::new(InMemorySettings::default());
        let (feed, tx) = ChannelFeed::new();
        let state = SiteConfigState::init(store, Arc::new(feed)).await;

        state.teardown().await;
        assert!(state.listener.lock().unwrap().is_none());

        // Listener is gone; notifications go nowhere
        let _ = tx.send(THEME_KEY.to_string());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.snapshot().await.revision, 1);
    }
}
