//! Send process - one cancellable delivery task per `sending` campaign

use async_trait::async_trait;
use pressroom_common::types::CampaignId;
use pressroom_common::Result;
use pressroom_storage::models::{Campaign, CampaignStatus};
use pressroom_storage::repository::CampaignRepository;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Performs the delivery of a campaign that entered `sending`
#[async_trait]
pub trait CampaignDelivery: Send + Sync {
    async fn deliver(&self, campaign: &Campaign) -> Result<()>;
}

/// Delivery stand-in: waits a fixed delay, then reports success.
/// No mail leaves the process.
pub struct SimulatedDelivery {
    delay: Duration,
}

impl SimulatedDelivery {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CampaignDelivery for SimulatedDelivery {
    async fn deliver(&self, campaign: &Campaign) -> Result<()> {
        debug!(campaign_id = %campaign.id, delay = ?self.delay, "Simulating campaign delivery");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Outcome of a send task, broadcast to observers
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignEvent {
    SendCompleted { campaign_id: CampaignId },
    SendFailed { campaign_id: CampaignId, error: String },
    SendCancelled { campaign_id: CampaignId },
}

struct PendingSend {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<CampaignId, PendingSend>>>;

/// Owns the pending send tasks
pub struct SendTracker {
    campaigns: Arc<dyn CampaignRepository>,
    delivery: Arc<dyn CampaignDelivery>,
    pending: PendingMap,
    generation: AtomicU64,
    shutdown: CancellationToken,
    events: broadcast::Sender<CampaignEvent>,
}

impl SendTracker {
    pub fn new(campaigns: Arc<dyn CampaignRepository>, delivery: Arc<dyn CampaignDelivery>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            campaigns,
            delivery,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            events,
        }
    }

    /// Receive completion events
    pub fn subscribe(&self) -> broadcast::Receiver<CampaignEvent> {
        self.events.subscribe()
    }

    /// Number of sends still pending
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_pending(&self, campaign_id: CampaignId) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(&campaign_id))
            .unwrap_or(false)
    }

    /// Start the send task for a campaign already written as `sending`.
    /// A previous task for the same campaign is cancelled first.
    pub fn start(&self, campaign: Campaign) {
        if self.shutdown.is_cancelled() {
            warn!(campaign_id = %campaign.id, "Send tracker is shut down, not starting send");
            return;
        }

        let campaign_id = campaign.id;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let token = self.shutdown.child_token();

        let task = SendTask {
            campaign,
            generation,
            token: token.clone(),
            campaigns: Arc::clone(&self.campaigns),
            delivery: Arc::clone(&self.delivery),
            pending: Arc::clone(&self.pending),
            events: self.events.clone(),
        };

        // Hold the lock across spawn so the task cannot deregister before
        // it has been registered.
        let Ok(mut pending) = self.pending.lock() else {
            error!(campaign_id = %campaign_id, "Send tracker state poisoned");
            return;
        };
        let handle = tokio::spawn(task.run());
        if let Some(previous) = pending.insert(
            campaign_id,
            PendingSend {
                generation,
                token,
                handle,
            },
        ) {
            previous.token.cancel();
        }

        info!(campaign_id = %campaign_id, "Campaign send started");
    }

    /// Cancel the pending send for a campaign. Returns whether one existed.
    pub fn cancel(&self, campaign_id: CampaignId) -> bool {
        let removed = self
            .pending
            .lock()
            .ok()
            .and_then(|mut p| p.remove(&campaign_id));

        match removed {
            Some(send) => {
                send.token.cancel();
                info!(campaign_id = %campaign_id, "Campaign send cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending send and wait for the tasks to finish
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain().map(|(_, send)| send.handle).collect(),
            Err(_) => Vec::new(),
        };

        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Send task ended abnormally: {}", e);
            }
        }

        info!(cancelled = count, "Send tracker shut down");
    }
}

struct SendTask {
    campaign: Campaign,
    generation: u64,
    token: CancellationToken,
    campaigns: Arc<dyn CampaignRepository>,
    delivery: Arc<dyn CampaignDelivery>,
    pending: PendingMap,
    events: broadcast::Sender<CampaignEvent>,
}

impl SendTask {
    async fn run(self) {
        let campaign_id = self.campaign.id;

        let outcome = tokio::select! {
            _ = self.token.cancelled() => None,
            result = self.delivery.deliver(&self.campaign) => Some(result),
        };

        let event = match outcome {
            None => {
                debug!(campaign_id = %campaign_id, "Send task cancelled before completion");
                CampaignEvent::SendCancelled { campaign_id }
            }
            Some(Ok(())) => self.finish(CampaignStatus::Sent, None).await,
            Some(Err(e)) => {
                warn!(campaign_id = %campaign_id, error = %e, "Campaign delivery failed");
                self.finish(CampaignStatus::Failed, Some(e.to_string())).await
            }
        };

        self.deregister();
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Write the final status, but only if the campaign is still `sending`
    async fn finish(&self, status: CampaignStatus, failure: Option<String>) -> CampaignEvent {
        let campaign_id = self.campaign.id;

        match self
            .campaigns
            .set_status_if(campaign_id, CampaignStatus::Sending, status)
            .await
        {
            Ok(Some(_)) => {
                info!(campaign_id = %campaign_id, status = %status, "Campaign send finished");
                match failure {
                    Some(error) => CampaignEvent::SendFailed { campaign_id, error },
                    None => CampaignEvent::SendCompleted { campaign_id },
                }
            }
            Ok(None) => {
                debug!(campaign_id = %campaign_id, "Campaign left 'sending' before completion");
                CampaignEvent::SendCancelled { campaign_id }
            }
            Err(e) => {
                error!(campaign_id = %campaign_id, error = %e, "Failed to record send result");
                CampaignEvent::SendFailed {
                    campaign_id,
                    error: e.to_string(),
                }
            }
        }
    }

    fn deregister(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending
                .get(&self.campaign.id)
                .map(|p| p.generation == self.generation)
                .unwrap_or(false)
            {
                pending.remove(&self.campaign.id);
            }
        }
    }
}
