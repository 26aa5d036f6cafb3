//! In-memory repository fakes for unit tests
//!
//! Compiled for this crate's tests and, behind the `test-support` feature,
//! for the API crate's handler tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pressroom_common::types::{
    AccessTokenId, CampaignId, ContactId, Page, PostId, ProfileId, ProviderKeyId, SmtpConfigId,
    UserRole,
};
use pressroom_common::{Error, Result};
use pressroom_storage::models::{
    AccessToken, Campaign, CampaignStatus, Contact, CreateContact, CreateSmtpConfig, NewCampaign, NewPost,
    NewProviderKey, Post, PostStatus, Profile, ProviderKey, SiteSetting, SmtpConfig, UpdateContact,
    UpdatePost,
};
use pressroom_storage::repository::{
    AccessTokenRepository, CampaignRepository, ContactRepository, PostRepository,
    ProfileRepository, ProviderKeyRepository,
    SettingsChangeFeed, SettingsSubscription, SiteSettingsRepository, SmtpConfigRepository,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

fn write_guard(fail: &AtomicBool) -> Result<()> {
    if fail.load(Ordering::SeqCst) {
        Err(Error::Database("write rejected".to_string()))
    } else {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCampaigns {
    rows: Mutex<HashMap<CampaignId, Campaign>>,
    pub fail_writes: AtomicBool,
}

impl InMemoryCampaigns {
    pub fn insert(&self, campaign: Campaign) {
        self.rows.lock().unwrap().insert(campaign.id, campaign);
    }

    pub fn row(&self, id: CampaignId) -> Option<Campaign> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn update(
        &self,
        id: CampaignId,
        f: impl FnOnce(&mut Campaign) -> bool,
    ) -> Result<Option<Campaign>> {
        write_guard(&self.fail_writes)?;
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(&id).and_then(|c| {
            if f(c) {
                c.updated_at = Utc::now();
                Some(c.clone())
            } else {
                None
            }
        }))
    }
}

pub fn campaign_with_status(status: CampaignStatus) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: Uuid::new_v4(),
        name: "Spring promo".to_string(),
        subject: "Deals inside".to_string(),
        content: "<p>Hello {{first_name}}, big deals this week.</p>".to_string(),
        smtp_config_id: Some(Uuid::new_v4()),
        status,
        scheduled_for: None,
        sent_at: None,
        target_tags: vec![],
        total_recipients: 0,
        sent_count: 0,
        failed_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaigns {
    async fn list(&self) -> Result<Vec<Campaign>> {
        let mut rows: Vec<Campaign> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        Ok(self.row(id))
    }

    async fn create(&self, input: NewCampaign) -> Result<Campaign> {
        write_guard(&self.fail_writes)?;
        let mut campaign = campaign_with_status(CampaignStatus::Draft);
        campaign.name = input.name;
        campaign.subject = input.subject;
        campaign.content = input.content;
        campaign.smtp_config_id = Some(input.smtp_config_id);
        campaign.target_tags = input.target_tags;
        campaign.scheduled_for = input.scheduled_for;
        self.insert(campaign.clone());
        Ok(campaign)
    }

    async fn set_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        self.update(id, |c| {
            c.status = status;
            true
        })
    }

    async fn set_status_if(
        &self,
        id: CampaignId,
        expected: CampaignStatus,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        self.update(id, |c| {
            if c.status == expected {
                c.status = status;
                true
            } else {
                false
            }
        })
    }

    async fn schedule(&self, id: CampaignId, at: DateTime<Utc>) -> Result<Option<Campaign>> {
        self.update(id, |c| {
            c.status = CampaignStatus::Scheduled;
            c.scheduled_for = Some(at);
            true
        })
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        write_guard(&self.fail_writes)?;
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryContacts {
    rows: Mutex<Vec<Contact>>,
}

impl InMemoryContacts {
    pub fn with(contacts: Vec<(&str, &[&str], bool)>) -> Self {
        let now = Utc::now();
        let rows = contacts
            .into_iter()
            .map(|(email, tags, subscribed)| Contact {
                id: Uuid::new_v4(),
                email: email.to_string(),
                first_name: None,
                last_name: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                is_subscribed: subscribed,
                created_at: now,
                updated_at: now,
            })
            .collect();
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl ContactRepository for InMemoryContacts {
    async fn list(&self, tag: Option<&str>, page: Page) -> Result<Vec<Contact>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| tag.map(|t| c.tags.iter().any(|x| x == t)).unwrap_or(true))
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, input: CreateContact) -> Result<Contact> {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            tags: input.tags,
            is_subscribed: input.is_subscribed,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(contact.clone());
        Ok(contact)
    }

    async fn update(&self, id: ContactId, input: UpdateContact) -> Result<Option<Contact>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|c| c.id == id).map(|c| {
            if let Some(first_name) = input.first_name {
                c.first_name = Some(first_name);
            }
            if let Some(last_name) = input.last_name {
                c.last_name = Some(last_name);
            }
            if let Some(tags) = input.tags {
                c.tags = tags;
            }
            if let Some(subscribed) = input.is_subscribed {
                c.is_subscribed = subscribed;
            }
            c.clone()
        }))
    }

    async fn delete(&self, id: ContactId) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() != before)
    }

    async fn distinct_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .flat_map(|c| c.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn count_audience(&self, tags: &[String]) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.matches_audience(tags))
            .count() as i64)
    }
}

#[derive(Default)]
pub struct InMemorySmtpConfigs {
    rows: Mutex<Vec<SmtpConfig>>,
}

impl InMemorySmtpConfigs {
    pub fn add(&self, name: &str, active: bool) -> SmtpConfig {
        let now = Utc::now();
        let config = SmtpConfig {
            id: Uuid::new_v4(),
            name: name.to_string(),
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            encryption: "tls".to_string(),
            from_email: "news@example.com".to_string(),
            from_name: Some("Newsroom".to_string()),
            is_active: active,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(config.clone());
        config
    }
}

#[async_trait]
impl SmtpConfigRepository for InMemorySmtpConfigs {
    async fn list(&self, active_only: bool) -> Result<Vec<SmtpConfig>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_active || !active_only)
            .cloned()
            .collect())
    }

    async fn get(&self, id: SmtpConfigId) -> Result<Option<SmtpConfig>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, input: CreateSmtpConfig) -> Result<SmtpConfig> {
        Ok(self.add(&input.name, true))
    }

    async fn set_active(&self, id: SmtpConfigId, active: bool) -> Result<Option<SmtpConfig>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|c| c.id == id).map(|c| {
            c.is_active = active;
            c.clone()
        }))
    }

    async fn delete(&self, id: SmtpConfigId) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryPosts {
    rows: Mutex<Vec<Post>>,
}

impl InMemoryPosts {
    pub fn all(&self) -> Vec<Post> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostRepository for InMemoryPosts {
    async fn list(&self, status: Option<PostStatus>, page: Page) -> Result<Vec<Post>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| status.map(|s| p.status == s).unwrap_or(true))
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, input: NewPost) -> Result<Post> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: input.title,
            slug: input.slug,
            content: input.content,
            excerpt: input.excerpt,
            featured_image: input.featured_image,
            status: input.status,
            author_id: input.author_id,
            published_at: (input.status == PostStatus::Published).then_some(now),
            seo_title: input.seo_title,
            seo_description: input.seo_description,
            seo_keywords: input.seo_keywords,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update(&self, id: PostId, input: UpdatePost) -> Result<Option<Post>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(title) = input.title {
                p.title = title;
            }
            if let Some(slug) = input.slug {
                p.slug = slug;
            }
            if let Some(content) = input.content {
                p.content = content;
            }
            if let Some(status) = input.status {
                p.status = status;
            }
            p.clone()
        }))
    }

    async fn delete(&self, id: PostId) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryProviderKeys {
    rows: Mutex<Vec<ProviderKey>>,
}

impl InMemoryProviderKeys {
    pub fn add(&self, provider: &str, key: &str, active: bool) {
        let now = Utc::now();
        self.rows.lock().unwrap().push(ProviderKey {
            id: Uuid::new_v4(),
            provider: provider.to_string(),
            name: format!("{} key", provider),
            key: key.to_string(),
            is_active: active,
            created_at: now,
            updated_at: now,
        });
    }
}

#[async_trait]
impl ProviderKeyRepository for InMemoryProviderKeys {
    async fn list(&self) -> Result<Vec<ProviderKey>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn list_active(&self) -> Result<Vec<ProviderKey>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.is_active)
            .cloned()
            .collect())
    }

    async fn create(&self, input: NewProviderKey) -> Result<ProviderKey> {
        self.add(&input.provider, &input.key, input.is_active);
        self.rows
            .lock()
            .unwrap()
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("insert lost".to_string()))
    }

    async fn set_active(&self, id: ProviderKeyId, active: bool) -> Result<Option<ProviderKey>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|k| k.id == id).map(|k| {
            k.is_active = active;
            k.clone()
        }))
    }

    async fn delete(&self, id: ProviderKeyId) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|k| k.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct InMemorySettings {
    rows: Mutex<HashMap<String, serde_json::Value>>,
    pub fail_reads: AtomicBool,
}

#[async_trait]
impl SiteSettingsRepository for InMemorySettings {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database("read failed".to_string()));
        }
        Ok(self.rows.lock().unwrap().get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<SiteSetting>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database("read failed".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| SiteSetting {
                key: k.clone(),
                value: v.clone(),
                updated_at: Utc::now(),
            })
            .collect())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<SiteSetting> {
        self.rows
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(SiteSetting {
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        })
    }
}

/// Settings feed driven by an mpsc channel
pub struct ChannelFeed {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl ChannelFeed {
    pub fn new() -> (Self, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

struct ChannelSubscription {
    receiver: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl SettingsChangeFeed for ChannelFeed {
    async fn subscribe(&self) -> Result<Box<dyn SettingsSubscription>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Internal("already subscribed".to_string()))?;
        Ok(Box::new(ChannelSubscription { receiver }))
    }
}

#[async_trait]
impl SettingsSubscription for ChannelSubscription {
    async fn next_change(&mut self) -> Result<Option<String>> {
        Ok(self.receiver.recv().await)
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    rows: Mutex<Vec<Profile>>,
}

#[async_trait]
impl ProfileRepository for InMemoryProfiles {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>> {
        Ok(self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn create(
        &self,
        email: &str,
        full_name: Option<&str>,
        role: UserRole,
    ) -> Result<Profile> {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(profile.clone());
        Ok(profile)
    }
}

#[derive(Default)]
pub struct InMemoryAccessTokens {
    rows: Mutex<Vec<AccessToken>>,
}

impl InMemoryAccessTokens {
    pub fn last_used(&self, id: AccessTokenId) -> Option<DateTime<Utc>> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.last_used_at)
    }
}

#[async_trait]
impl AccessTokenRepository for InMemoryAccessTokens {
    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<AccessToken>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.token_prefix == prefix)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        profile_id: ProfileId,
        name: &str,
        token_hash: &str,
        token_prefix: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessToken> {
        let token = AccessToken {
            id: Uuid::new_v4(),
            profile_id,
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            token_prefix: token_prefix.to_string(),
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(token.clone());
        Ok(token)
    }

    async fn update_last_used(&self, id: AccessTokenId) -> Result<()> {
        if let Some(token) = self.rows.lock().unwrap().iter_mut().find(|t| t.id == id) {
            token.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}
