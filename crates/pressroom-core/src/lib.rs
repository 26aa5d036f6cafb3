//! Pressroom Core - campaign orchestration and the AI content pipeline
//!
//! This crate holds the business logic behind the API: the campaign wizard,
//! lifecycle transitions and send process, AI key resolution and content
//! generation, post publishing, site configuration state, uploads and the
//! SMTP connection test.

pub mod ai;
pub mod campaign;
pub mod publish;
pub mod site;
pub mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use ai::{AiConfigResolver, ContentGenerator, GenerationError, GenerationMode, GenerationRequest};
pub use campaign::{
    CampaignAction, CampaignDraft, CampaignError, CampaignEvent, CampaignManager, CampaignWizard,
    SendTracker, SimulatedDelivery, TransitionOutcome,
};
pub use publish::PostPublisher;
pub use site::{SiteConfig, SiteConfigState};
pub use smtp_test::SmtpTester;
pub use upload::UploadService;
