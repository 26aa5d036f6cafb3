//! Four-step campaign creation wizard

use super::manager::{CampaignDraft, CampaignError, CampaignManager};
use chrono::{DateTime, Utc};
use pressroom_common::types::SmtpConfigId;
use pressroom_storage::models::Campaign;
use serde::{Deserialize, Serialize};

/// Wizard steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Details = 1,
    Content = 2,
    Audience = 3,
    Review = 4,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    fn next(&self) -> Option<Self> {
        match self {
            WizardStep::Details => Some(WizardStep::Content),
            WizardStep::Content => Some(WizardStep::Audience),
            WizardStep::Audience => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    fn previous(&self) -> Option<Self> {
        match self {
            WizardStep::Details => None,
            WizardStep::Content => Some(WizardStep::Details),
            WizardStep::Audience => Some(WizardStep::Content),
            WizardStep::Review => Some(WizardStep::Audience),
        }
    }
}

/// Read-only view shown on the review step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardSummary {
    pub name: String,
    pub subject: String,
    pub smtp_config_id: Option<SmtpConfigId>,
    /// `None` means every subscribed contact
    pub audience: Option<Vec<String>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub content_length: usize,
}

/// Wizard state. Steps cannot be skipped; going back is always allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignWizard {
    step: WizardStep,
    draft: CampaignDraft,
}

impl Default for CampaignWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Details,
            draft: CampaignDraft::default(),
        }
    }

    /// Resume a wizard from previously entered input, at the first step
    pub fn from_draft(draft: CampaignDraft) -> Self {
        Self {
            step: WizardStep::Details,
            draft,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &CampaignDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut CampaignDraft {
        &mut self.draft
    }

    fn validate_step(&self) -> Result<(), CampaignError> {
        match self.step {
            WizardStep::Details => self.draft.validate_details(),
            WizardStep::Content => self.draft.validate_content(),
            WizardStep::Audience | WizardStep::Review => Ok(()),
        }
    }

    /// Advance one step. On validation failure the step is unchanged.
    pub fn next(&mut self) -> Result<WizardStep, CampaignError> {
        self.validate_step()?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Advance until `target` or the first failing step
    pub fn advance_to(&mut self, target: WizardStep) -> Result<WizardStep, CampaignError> {
        while self.step < target {
            self.next()?;
        }
        Ok(self.step)
    }

    /// Add the tag to the audience, or remove it if already selected
    pub fn toggle_tag(&mut self, tag: &str) {
        let tags = &mut self.draft.target_tags;
        if let Some(pos) = tags.iter().position(|t| t == tag) {
            tags.remove(pos);
        } else {
            tags.push(tag.to_string());
        }
    }

    pub fn set_schedule(&mut self, date: Option<DateTime<Utc>>) {
        self.draft.scheduled_for = date;
    }

    pub fn summary(&self) -> WizardSummary {
        WizardSummary {
            name: self.draft.name.clone(),
            subject: self.draft.subject.clone(),
            smtp_config_id: self.draft.smtp_config_id,
            audience: (!self.draft.target_tags.is_empty()).then(|| self.draft.target_tags.clone()),
            scheduled_for: self.draft.scheduled_for,
            content_length: self.draft.content.chars().count(),
        }
    }

    /// Create the campaign. Only valid on the review step; the wizard is
    /// reset after success and left untouched on failure.
    pub async fn finish(&mut self, manager: &CampaignManager) -> Result<Campaign, CampaignError> {
        if self.step != WizardStep::Review {
            return Err(CampaignError::Validation(format!(
                "Campaign can only be created from the review step (current step {})",
                self.step.number()
            )));
        }

        let campaign = manager.create_campaign(self.draft.clone()).await?;
        *self = Self::new();
        Ok(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::manager::DEFAULT_CONTENT_TEMPLATE;
    use crate::campaign::send::{SendTracker, SimulatedDelivery};
    use crate::test_support::{InMemoryCampaigns, InMemoryContacts, InMemorySmtpConfigs};
    use pretty_assertions::assert_eq;
    use pressroom_storage::models::CampaignStatus;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn manager(senders: Arc<InMemorySmtpConfigs>) -> CampaignManager {
        let campaigns = Arc::new(InMemoryCampaigns::default());
        let tracker = Arc::new(SendTracker::new(
            campaigns.clone(),
            Arc::new(SimulatedDelivery::new(Duration::from_secs(5))),
        ));
        CampaignManager::new(
            campaigns,
            Arc::new(InMemoryContacts::default()),
            senders,
            tracker,
        )
    }

    fn filled(sender: SmtpConfigId) -> CampaignWizard {
        let mut wizard = CampaignWizard::new();
        let draft = wizard.draft_mut();
        draft.name = "Nov Newsletter".to_string();
        draft.subject = "Big News".to_string();
        draft.smtp_config_id = Some(sender);
        wizard
    }

    #[test]
    fn test_starts_on_details_with_template() {
        let wizard = CampaignWizard::new();
        assert_eq!(wizard.step(), WizardStep::Details);
        assert_eq!(wizard.draft().content, DEFAULT_CONTENT_TEMPLATE);
        assert!(wizard.draft().target_tags.is_empty());
    }

    #[test]
    fn test_details_requires_name_subject_and_sender() {
        let mut wizard = CampaignWizard::new();
        assert!(wizard.next().is_err());
        assert_eq!(wizard.step(), WizardStep::Details);

        wizard.draft_mut().name = "Nov Newsletter".to_string();
        wizard.draft_mut().subject = "   ".to_string();
        wizard.draft_mut().smtp_config_id = Some(Uuid::new_v4());
        assert!(wizard.next().is_err());
        assert_eq!(wizard.step(), WizardStep::Details);

        wizard.draft_mut().subject = "Big News".to_string();
        wizard.draft_mut().smtp_config_id = None;
        assert!(wizard.next().is_err());

        wizard.draft_mut().smtp_config_id = Some(Uuid::new_v4());
        assert_eq!(wizard.next().unwrap(), WizardStep::Content);
    }

    #[test]
    fn test_content_needs_more_than_twenty_chars() {
        let mut wizard = filled(Uuid::new_v4());
        wizard.next().unwrap();

        wizard.draft_mut().content = "a".repeat(20);
        let err = wizard.next().unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
        assert_eq!(wizard.step(), WizardStep::Content);

        wizard.draft_mut().content = "a".repeat(21);
        assert_eq!(wizard.next().unwrap(), WizardStep::Audience);
    }

    #[test]
    fn test_content_length_counts_utf16_units() {
        let mut wizard = filled(Uuid::new_v4());
        wizard.next().unwrap();

        // Ten emoji are 10 chars but 20 UTF-16 units
        wizard.draft_mut().content = "\u{1F4E8}".repeat(10);
        assert!(wizard.next().is_err());

        wizard.draft_mut().content = format!("{}a", "\u{1F4E8}".repeat(10));
        assert_eq!(wizard.next().unwrap(), WizardStep::Audience);
    }

    #[test]
    fn test_audience_and_review_always_valid() {
        let mut wizard = filled(Uuid::new_v4());
        assert_eq!(wizard.advance_to(WizardStep::Audience).unwrap(), WizardStep::Audience);
        assert_eq!(wizard.next().unwrap(), WizardStep::Review);
        // Review is the last step
        assert_eq!(wizard.next().unwrap(), WizardStep::Review);
    }

    #[test]
    fn test_back_is_unrestricted() {
        let mut wizard = filled(Uuid::new_v4());
        wizard.advance_to(WizardStep::Review).unwrap();

        // Invalidating earlier input does not block going back
        wizard.draft_mut().name.clear();
        assert_eq!(wizard.back(), WizardStep::Audience);
        assert_eq!(wizard.back(), WizardStep::Content);
        assert_eq!(wizard.back(), WizardStep::Details);
        assert_eq!(wizard.back(), WizardStep::Details);
    }

    #[test]
    fn test_toggle_tag_and_summary() {
        let mut wizard = filled(Uuid::new_v4());
        assert_eq!(wizard.summary().audience, None);

        wizard.toggle_tag("VIP");
        wizard.toggle_tag("b2b");
        wizard.toggle_tag("VIP");
        assert_eq!(wizard.summary().audience, Some(vec!["b2b".to_string()]));

        let date = Utc::now();
        wizard.set_schedule(Some(date));
        let summary = wizard.summary();
        assert_eq!(summary.scheduled_for, Some(date));
        assert_eq!(summary.name, "Nov Newsletter");
        assert_eq!(summary.content_length, DEFAULT_CONTENT_TEMPLATE.chars().count());
    }

    #[tokio::test]
    async fn test_finish_only_from_review() {
        let senders = Arc::new(InMemorySmtpConfigs::default());
        let sender = senders.add("Primary", true);
        let manager = manager(senders);

        let mut wizard = filled(sender.id);
        wizard.next().unwrap();
        let before = wizard.clone();
        assert!(wizard.finish(&manager).await.is_err());
        assert_eq!(wizard, before);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finish_creates_draft_and_resets() {
        let senders = Arc::new(InMemorySmtpConfigs::default());
        let sender = senders.add("Primary", true);
        let manager = manager(senders);

        let mut wizard = filled(sender.id);
        wizard.toggle_tag("VIP");
        wizard.advance_to(WizardStep::Review).unwrap();

        let campaign = wizard.finish(&manager).await.unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.name, "Nov Newsletter");
        assert_eq!(campaign.target_tags, vec!["VIP".to_string()]);
        assert_eq!(wizard, CampaignWizard::new());
    }

    #[tokio::test]
    async fn test_failed_finish_keeps_input() {
        let senders = Arc::new(InMemorySmtpConfigs::default());
        let sender = senders.add("Retired", false);
        let manager = manager(senders);

        let mut wizard = filled(sender.id);
        wizard.toggle_tag("VIP");
        wizard.advance_to(WizardStep::Review).unwrap();
        let before = wizard.clone();

        let err = wizard.finish(&manager).await.unwrap_err();
        assert!(matches!(err, CampaignError::InactiveSender(_)));
        assert_eq!(wizard, before);
        assert_eq!(wizard.step(), WizardStep::Review);
    }
}
