//! Campaign repository

use crate::db::DatabasePool;
use crate::models::{Campaign, CampaignRow, CampaignStatus, NewCampaign};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pressroom_common::types::CampaignId;
use pressroom_common::{Error, Result};
use uuid::Uuid;

const CAMPAIGN_COLUMNS: &str = "id, name, subject, content, smtp_config_id, status, \
     scheduled_for, sent_at, target_tags, total_recipients, sent_count, failed_count, \
     created_at, updated_at";

/// Campaign repository trait
///
/// Rows are created as drafts and afterwards only change through status
/// writes; there is no edit-in-place.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// All campaigns, newest first
    async fn list(&self) -> Result<Vec<Campaign>>;

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;

    /// Insert a new draft campaign
    async fn create(&self, input: NewCampaign) -> Result<Campaign>;

    /// Overwrite the status. Returns `None` when the row is gone.
    async fn set_status(&self, id: CampaignId, status: CampaignStatus)
        -> Result<Option<Campaign>>;

    /// Overwrite the status only while the row is still in `expected`.
    /// Returns `None` when the row is gone or has moved on.
    async fn set_status_if(
        &self,
        id: CampaignId,
        expected: CampaignStatus,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>>;

    /// Set status `scheduled` and store the date
    async fn schedule(&self, id: CampaignId, at: DateTime<Utc>) -> Result<Option<Campaign>>;

    /// Returns whether a row was deleted
    async fn delete(&self, id: CampaignId) -> Result<bool>;
}

/// Database campaign repository
pub struct DbCampaignRepository {
    pool: DatabasePool,
}

impl DbCampaignRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for DbCampaignRepository {
    async fn list(&self) -> Result<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {} FROM campaigns ORDER BY created_at DESC",
            CAMPAIGN_COLUMNS
        ))
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Campaign::try_from).collect()
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {} FROM campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(Campaign::try_from)
        .transpose()
    }

    async fn create(&self, input: NewCampaign) -> Result<Campaign> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            INSERT INTO campaigns (
                id, name, subject, content, smtp_config_id, status,
                scheduled_for, target_tags, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.subject)
        .bind(&input.content)
        .bind(input.smtp_config_id)
        .bind(CampaignStatus::Draft.as_str())
        .bind(input.scheduled_for)
        .bind(&input.target_tags)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Campaign::try_from(row)
    }

    async fn set_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, CampaignRow>(&format!(
            "UPDATE campaigns SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(Campaign::try_from)
        .transpose()
    }

    async fn set_status_if(
        &self,
        id: CampaignId,
        expected: CampaignStatus,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(status.as_str())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(Campaign::try_from)
        .transpose()
    }

    async fn schedule(&self, id: CampaignId, at: DateTime<Utc>) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET status = $2, scheduled_for = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .bind(CampaignStatus::Scheduled.as_str())
        .bind(at)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(Campaign::try_from)
        .transpose()
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
