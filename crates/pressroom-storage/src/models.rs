//! Database models

use chrono::{DateTime, Utc};
use pressroom_common::types::{
    AccessTokenId, CampaignId, ContactId, PostId, ProfileId, ProviderKeyId, SmtpConfigId,
    UserRole,
};
use pressroom_common::Error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Admin profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Role as an enum; unknown values fall back to the least privileged role
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::User)
    }
}

/// Hashed bearer token bound to a profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: AccessTokenId,
    pub profile_id: ProfileId,
    pub name: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub token_prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at < Utc::now()).unwrap_or(false)
    }
}

/// Mailing list contact
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub tags: Vec<String>,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Whether the contact falls inside an audience filter (empty = everyone)
    pub fn matches_audience(&self, tags: &[String]) -> bool {
        self.is_subscribed && (tags.is_empty() || self.tags.iter().any(|t| tags.contains(t)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_subscribed")]
    pub is_subscribed: bool,
}

fn default_subscribed() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_subscribed: Option<bool>,
}

/// Transport security for an SMTP sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpEncryption {
    None,
    Ssl,
    Tls,
}

impl std::fmt::Display for SmtpEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtpEncryption::None => write!(f, "none"),
            SmtpEncryption::Ssl => write!(f, "ssl"),
            SmtpEncryption::Tls => write!(f, "tls"),
        }
    }
}

impl std::str::FromStr for SmtpEncryption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SmtpEncryption::None),
            "ssl" => Ok(SmtpEncryption::Ssl),
            "tls" => Ok(SmtpEncryption::Tls),
            other => Err(Error::Validation(format!("Invalid encryption mode: {}", other))),
        }
    }
}

/// Sender configuration used by campaigns
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub id: SmtpConfigId,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub encryption: String,
    pub from_email: String,
    pub from_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SmtpConfig {
    pub fn encryption_mode(&self) -> SmtpEncryption {
        self.encryption.parse().unwrap_or(SmtpEncryption::Tls)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSmtpConfig {
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub encryption: SmtpEncryption,
    pub from_email: String,
    pub from_name: Option<String>,
}

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Paused,
    Stopped,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Stopped => "stopped",
            CampaignStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "paused" => Ok(CampaignStatus::Paused),
            "stopped" => Ok(CampaignStatus::Stopped),
            "failed" => Ok(CampaignStatus::Failed),
            _ => Err(Error::Database(format!("Invalid campaign status: {}", s))),
        }
    }
}

/// Campaign model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub smtp_config_id: Option<SmtpConfigId>,
    pub status: CampaignStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub target_tags: Vec<String>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `campaigns` row
#[derive(Debug, Clone, FromRow)]
pub(crate) struct CampaignRow {
    pub id: CampaignId,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub smtp_config_id: Option<SmtpConfigId>,
    pub status: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub target_tags: Vec<String>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = Error;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        Ok(Campaign {
            id: row.id,
            name: row.name,
            subject: row.subject,
            content: row.content,
            smtp_config_id: row.smtp_config_id,
            status: row.status.parse()?,
            scheduled_for: row.scheduled_for,
            sent_at: row.sent_at,
            target_tags: row.target_tags,
            total_recipients: row.total_recipients,
            sent_count: row.sent_count,
            failed_count: row.failed_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Campaign insert; the row always starts as a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub smtp_config_id: SmtpConfigId,
    pub target_tags: Vec<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Post status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            _ => Err(Error::Validation(format!("Invalid post status: {}", s))),
        }
    }
}

/// Blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub author_id: Option<ProfileId>,
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `posts` row
#[derive(Debug, Clone, FromRow)]
pub(crate) struct PostRow {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: String,
    pub author_id: Option<ProfileId>,
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = Error;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            featured_image: row.featured_image,
            status: row
                .status
                .parse()
                .map_err(|_| Error::Database(format!("Invalid post status: {}", row.status)))?,
            author_id: row.author_id,
            published_at: row.published_at,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            seo_keywords: row.seo_keywords,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub author_id: Option<ProfileId>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<PostStatus>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

/// Vendor credential row (`api_keys` table)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProviderKey {
    pub id: ProviderKeyId,
    pub provider: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderKey {
    /// Last four characters of the secret, for display
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProviderKey {
    pub provider: String,
    pub name: String,
    pub key: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Key/value site setting
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
