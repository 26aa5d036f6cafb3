//! Repository layer for data access

pub mod access_tokens;
pub mod campaigns;
pub mod contacts;
pub mod posts;
pub mod profiles;
pub mod provider_keys;
pub mod site_settings;
pub mod smtp_configs;

// Repository traits
pub use access_tokens::AccessTokenRepository;
pub use campaigns::CampaignRepository;
pub use contacts::ContactRepository;
pub use posts::PostRepository;
pub use profiles::ProfileRepository;
pub use provider_keys::ProviderKeyRepository;
pub use site_settings::{
    SettingsChangeFeed, SettingsSubscription, SiteSettingsRepository, ANY_SETTING,
    SETTINGS_CHANNEL,
};
pub use smtp_configs::SmtpConfigRepository;

// Database implementations
pub use access_tokens::DbAccessTokenRepository;
pub use campaigns::DbCampaignRepository;
pub use contacts::DbContactRepository;
pub use posts::DbPostRepository;
pub use profiles::DbProfileRepository;
pub use provider_keys::DbProviderKeyRepository;
pub use site_settings::{DbSiteSettingsRepository, PgSettingsFeed};
pub use smtp_configs::DbSmtpConfigRepository;
