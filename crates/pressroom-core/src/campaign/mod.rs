//! Campaign Orchestrator
//!
//! Creation wizard, lifecycle transitions and the asynchronous send process.

pub mod manager;
pub mod send;
pub mod wizard;

pub use manager::{
    CampaignAction, CampaignDraft, CampaignError, CampaignManager, TransitionOutcome,
    DEFAULT_CONTENT_TEMPLATE,
};
pub use send::{CampaignDelivery, CampaignEvent, SendTracker, SimulatedDelivery};
pub use wizard::{CampaignWizard, WizardStep, WizardSummary};
