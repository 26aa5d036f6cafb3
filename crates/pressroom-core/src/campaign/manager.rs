//! Campaign Manager - campaign lifecycle and audience lookups

use super::send::SendTracker;
use chrono::{DateTime, Duration, Utc};
use pressroom_common::types::{CampaignId, SmtpConfigId};
use pressroom_storage::models::{Campaign, CampaignStatus, NewCampaign, SmtpConfig};
use pressroom_storage::repository::{CampaignRepository, ContactRepository, SmtpConfigRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Content shorter than this is treated as "no real content yet". Measured
/// in UTF-16 code units, the unit the editor reports.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Starting body offered by the creation wizard
pub const DEFAULT_CONTENT_TEMPLATE: &str =
    "<p>Hello {{first_name}},</p><p><br></p><p>Write your amazing content here...</p>";

/// Campaign manager errors
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Cannot {action} a campaign in status '{status}'")]
    InvalidTransition {
        action: CampaignAction,
        status: CampaignStatus,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Sender configuration not found")]
    UnknownSender,

    #[error("Sender configuration '{0}' is not active")]
    InactiveSender(String),

    #[error(transparent)]
    Storage(#[from] pressroom_common::Error),
}

impl From<CampaignError> for pressroom_common::Error {
    fn from(err: CampaignError) -> Self {
        use pressroom_common::Error;
        match err {
            CampaignError::NotFound => Error::NotFound("Campaign not found".to_string()),
            CampaignError::InvalidTransition { action, status } => Error::InvalidTransition {
                action: action.to_string(),
                status: status.to_string(),
            },
            CampaignError::Validation(msg) => Error::Validation(msg),
            e @ (CampaignError::UnknownSender | CampaignError::InactiveSender(_)) => {
                Error::Validation(e.to_string())
            }
            CampaignError::Storage(e) => e,
        }
    }
}

/// Lifecycle actions on an existing campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignAction {
    Send,
    Schedule,
    Pause,
    Stop,
    Delete,
}

impl CampaignAction {
    /// Whether the action may be applied to a campaign in `status`
    pub fn allowed_from(&self, status: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match self {
            CampaignAction::Send => matches!(status, Draft | Paused),
            CampaignAction::Schedule => matches!(status, Draft),
            CampaignAction::Pause => matches!(status, Sending | Scheduled),
            CampaignAction::Stop => !matches!(status, Stopped),
            CampaignAction::Delete => true,
        }
    }

    /// Status the campaign ends up in; `None` for deletion
    pub fn target_status(&self) -> Option<CampaignStatus> {
        match self {
            CampaignAction::Send => Some(CampaignStatus::Sending),
            CampaignAction::Schedule => Some(CampaignStatus::Scheduled),
            CampaignAction::Pause => Some(CampaignStatus::Paused),
            CampaignAction::Stop => Some(CampaignStatus::Stopped),
            CampaignAction::Delete => None,
        }
    }
}

impl std::fmt::Display for CampaignAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignAction::Send => write!(f, "send"),
            CampaignAction::Schedule => write!(f, "schedule"),
            CampaignAction::Pause => write!(f, "pause"),
            CampaignAction::Stop => write!(f, "stop"),
            CampaignAction::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for CampaignAction {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(CampaignAction::Send),
            "schedule" => Ok(CampaignAction::Schedule),
            "pause" => Ok(CampaignAction::Pause),
            "stop" => Ok(CampaignAction::Stop),
            "delete" => Ok(CampaignAction::Delete),
            other => Err(CampaignError::Validation(format!(
                "Unknown campaign action: {}",
                other
            ))),
        }
    }
}

/// Everything needed to create a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub subject: String,
    pub smtp_config_id: Option<SmtpConfigId>,
    pub content: String,
    #[serde(default)]
    pub target_tags: Vec<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Default for CampaignDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            subject: String::new(),
            smtp_config_id: None,
            content: DEFAULT_CONTENT_TEMPLATE.to_string(),
            target_tags: Vec::new(),
            scheduled_for: None,
        }
    }
}

impl CampaignDraft {
    /// Name, subject and sender are all present
    pub fn validate_details(&self) -> Result<(), CampaignError> {
        if self.name.trim().is_empty() {
            return Err(CampaignError::Validation("Campaign name is required".to_string()));
        }
        if self.subject.trim().is_empty() {
            return Err(CampaignError::Validation("Email subject is required".to_string()));
        }
        if self.smtp_config_id.is_none() {
            return Err(CampaignError::Validation("Please select a sender".to_string()));
        }
        Ok(())
    }

    /// The body has more than a token amount of content
    pub fn validate_content(&self) -> Result<(), CampaignError> {
        if self.content.encode_utf16().count() <= MIN_CONTENT_LENGTH {
            return Err(CampaignError::Validation(
                "Please add some content to your email".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Updated(Campaign),
    Deleted(CampaignId),
}

/// Campaign Manager - owns persisted campaign state and its transitions.
///
/// Transitions read the row, check the rule, then write. Two conflicting
/// calls racing on one campaign are last-write-wins.
pub struct CampaignManager {
    campaigns: Arc<dyn CampaignRepository>,
    contacts: Arc<dyn ContactRepository>,
    senders: Arc<dyn SmtpConfigRepository>,
    tracker: Arc<SendTracker>,
}

impl CampaignManager {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        contacts: Arc<dyn ContactRepository>,
        senders: Arc<dyn SmtpConfigRepository>,
        tracker: Arc<SendTracker>,
    ) -> Self {
        Self {
            campaigns,
            contacts,
            senders,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<SendTracker> {
        &self.tracker
    }

    pub async fn list(&self) -> Result<Vec<Campaign>, CampaignError> {
        Ok(self.campaigns.list().await?)
    }

    pub async fn get(&self, id: CampaignId) -> Result<Campaign, CampaignError> {
        self.campaigns.get(id).await?.ok_or(CampaignError::NotFound)
    }

    /// Insert a new draft. A chosen schedule date is stored but the status
    /// stays `draft` until an explicit action.
    pub async fn create_campaign(&self, draft: CampaignDraft) -> Result<Campaign, CampaignError> {
        draft.validate_details()?;
        draft.validate_content()?;

        let sender_id = draft.smtp_config_id.ok_or(CampaignError::UnknownSender)?;
        let sender = self
            .senders
            .get(sender_id)
            .await?
            .ok_or(CampaignError::UnknownSender)?;
        if !sender.is_active {
            return Err(CampaignError::InactiveSender(sender.name));
        }

        let mut target_tags: Vec<String> = Vec::with_capacity(draft.target_tags.len());
        for tag in draft.target_tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !target_tags.contains(&tag) {
                target_tags.push(tag);
            }
        }

        let campaign = self
            .campaigns
            .create(NewCampaign {
                name: draft.name.trim().to_string(),
                subject: draft.subject.trim().to_string(),
                content: draft.content,
                smtp_config_id: sender_id,
                target_tags,
                scheduled_for: draft.scheduled_for,
            })
            .await?;

        info!(
            campaign_id = %campaign.id,
            tags = campaign.target_tags.len(),
            "Campaign created"
        );

        Ok(campaign)
    }

    /// Apply a lifecycle action. Nothing is written when the action is not
    /// allowed from the current status.
    pub async fn transition(
        &self,
        id: CampaignId,
        action: CampaignAction,
        date: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome, CampaignError> {
        let campaign = self.get(id).await?;

        if !action.allowed_from(campaign.status) {
            debug!(
                campaign_id = %id,
                action = %action,
                status = %campaign.status,
                "Rejected campaign transition"
            );
            return Err(CampaignError::InvalidTransition {
                action,
                status: campaign.status,
            });
        }

        let outcome = match action {
            CampaignAction::Send => {
                let updated = self
                    .campaigns
                    .set_status(id, CampaignStatus::Sending)
                    .await?
                    .ok_or(CampaignError::NotFound)?;
                self.tracker.start(updated.clone());
                TransitionOutcome::Updated(updated)
            }
            CampaignAction::Schedule => {
                let at = date.unwrap_or_else(|| Utc::now() + Duration::hours(24));
                let updated = self
                    .campaigns
                    .schedule(id, at)
                    .await?
                    .ok_or(CampaignError::NotFound)?;
                TransitionOutcome::Updated(updated)
            }
            CampaignAction::Pause | CampaignAction::Stop => {
                let status = action
                    .target_status()
                    .ok_or_else(|| CampaignError::Validation("No target status".to_string()))?;
                let updated = self
                    .campaigns
                    .set_status(id, status)
                    .await?
                    .ok_or(CampaignError::NotFound)?;
                self.tracker.cancel(id);
                TransitionOutcome::Updated(updated)
            }
            CampaignAction::Delete => {
                if !self.campaigns.delete(id).await? {
                    return Err(CampaignError::NotFound);
                }
                self.tracker.cancel(id);
                TransitionOutcome::Deleted(id)
            }
        };

        info!(campaign_id = %id, action = %action, from = %campaign.status, "Campaign transitioned");

        Ok(outcome)
    }

    /// Sorted distinct tags across all contacts
    pub async fn available_tags(&self) -> Result<Vec<String>, CampaignError> {
        let mut tags = self.contacts.distinct_tags().await?;
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Subscribed contacts an audience filter reaches; an empty filter
    /// means every subscribed contact
    pub async fn audience_size(&self, tags: &[String]) -> Result<i64, CampaignError> {
        Ok(self.contacts.count_audience(tags).await?)
    }

    /// Senders a new campaign may use
    pub async fn sender_options(&self) -> Result<Vec<SmtpConfig>, CampaignError> {
        Ok(self.senders.list(true).await?)
    }
}
