use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use event_staffing_realtime::MealUpdatesClient;
use log::{debug, info, warn};

use super::extract::QrIdentity;
use super::machine::{Effect, ScanEvent, ScanMachine, ScanOutcome, ScanState};
use crate::api::EmployeeApi;
use crate::error::{Error, Result};
use crate::models::{ScanReceipt, ScanRequest};

/// Records a scanned identity with the server
#[async_trait]
pub trait ScanSubmitter: Send + Sync {
    async fn submit(&self, identity: &QrIdentity) -> Result<ScanReceipt>;
}

/// Tells other screens about a new meal count
#[async_trait]
pub trait ScanBroadcaster: Send + Sync {
    async fn broadcast(&self, meal_type: &str, new_count: u64) -> Result<()>;
}

#[async_trait]
impl ScanBroadcaster for MealUpdatesClient {
    async fn broadcast(&self, meal_type: &str, new_count: u64) -> Result<()> {
        self.publish_meal_scan(meal_type, new_count).await?;
        Ok(())
    }
}

/// Counts a meal for the scanned attendee
pub struct MealScanSubmitter {
    api: EmployeeApi,
    event_id: i64,
    meal_type: String,
    date: Option<NaiveDate>,
}

impl MealScanSubmitter {
    pub fn new(api: EmployeeApi, event_id: i64, meal_type: &str, date: Option<NaiveDate>) -> Self {
        Self {
            api,
            event_id,
            meal_type: meal_type.to_string(),
            date,
        }
    }
}

#[async_trait]
impl ScanSubmitter for MealScanSubmitter {
    async fn submit(&self, identity: &QrIdentity) -> Result<ScanReceipt> {
        let request = ScanRequest {
            event_id: self.event_id,
            meal_type: self.meal_type.clone(),
            date: self.date,
            email: identity.email().map(str::to_string),
            unique_id: identity.unique_id().map(str::to_string),
        };
        let mut receipt = self.api.scan_meal(&request).await?;
        receipt.meal_type.get_or_insert_with(|| self.meal_type.clone());
        Ok(receipt)
    }
}

/// Checks the scanned employee in to the event
pub struct CheckInSubmitter {
    api: EmployeeApi,
    event_id: i64,
}

impl CheckInSubmitter {
    pub fn new(api: EmployeeApi, event_id: i64) -> Self {
        Self { api, event_id }
    }
}

#[async_trait]
impl ScanSubmitter for CheckInSubmitter {
    async fn submit(&self, identity: &QrIdentity) -> Result<ScanReceipt> {
        let receipt = self.api.check_in(self.event_id, identity).await?;
        Ok(ScanReceipt {
            message: receipt.message,
            meal_type: None,
            new_count: None,
            attendee_name: receipt.name,
        })
    }
}

/// Drives a [`ScanMachine`] from decoder callbacks.
///
/// Decodes may arrive from several tasks at once; only the first one while
/// scanning is submitted.
pub struct ScanStation {
    machine: Mutex<ScanMachine>,
    submitter: Arc<dyn ScanSubmitter>,
    broadcaster: Option<Arc<dyn ScanBroadcaster>>,
    rearm_delay: Duration,
}

impl ScanStation {
    pub fn new(submitter: Arc<dyn ScanSubmitter>, rearm_delay: Duration) -> Self {
        Self {
            machine: Mutex::new(ScanMachine::new()),
            submitter,
            broadcaster: None,
            rearm_delay,
        }
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn ScanBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn state(&self) -> ScanState {
        self.lock().state().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScanMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, event: ScanEvent) -> Result<Effect> {
        self.lock().handle(event)
    }

    /// Applies `event` and returns the revision it left the machine in
    fn transition_tracked(&self, event: ScanEvent) -> Result<(Effect, u64)> {
        let mut machine = self.lock();
        let effect = machine.handle(event)?;
        Ok((effect, machine.revision()))
    }

    pub fn start(&self) -> Result<()> {
        self.transition(ScanEvent::Start)?;
        info!("Scanner started");
        Ok(())
    }

    pub fn stop(&self) {
        // Stop is accepted in every state
        let _ = self.transition(ScanEvent::Stop);
        info!("Scanner stopped");
    }

    /// Handle one decoded payload. `None` means the decode was dropped
    /// because another scan is in progress.
    pub async fn on_decoded(&self, text: &str) -> Result<Option<ScanOutcome>> {
        let (effect, revision) = self.transition_tracked(ScanEvent::Decoded(text.to_string()))?;
        let identity = match effect {
            Effect::Ignored => {
                debug!("Scan in progress, dropping decode");
                return Ok(None);
            }
            Effect::None => {
                return match self.state() {
                    ScanState::ShowingResult(outcome) => Ok(Some(outcome)),
                    other => Err(Error::InvalidTransition(format!("unexpected {}", other))),
                }
            }
            Effect::Submit(identity) => identity,
        };

        debug!("Submitting scan for {}", identity);
        let outcome = match self.submitter.submit(&identity).await {
            Ok(receipt) => self.accept(identity, receipt).await,
            Err(e) => {
                warn!("Scan for {} failed: {}", identity, e);
                ScanOutcome::Rejected {
                    message: e.display_message("Failed to record scan"),
                    identity: Some(identity),
                }
            }
        };

        let mut machine = self.lock();
        if machine.revision() == revision {
            machine.handle(ScanEvent::Completed(outcome.clone()))?;
        } else {
            debug!("Scanner restarted during submission, result not shown");
        }
        Ok(Some(outcome))
    }

    async fn accept(&self, identity: QrIdentity, receipt: ScanReceipt) -> ScanOutcome {
        if let (Some(broadcaster), Some(meal_type), Some(count)) =
            (&self.broadcaster, receipt.meal_type.as_deref(), receipt.new_count)
        {
            if let Err(e) = broadcaster.broadcast(meal_type, count).await {
                warn!("Failed to broadcast meal count: {}", e);
            }
        }
        let message = receipt.message.unwrap_or_else(|| match &receipt.attendee_name {
            Some(name) => format!("Recorded for {}", name),
            None => format!("Recorded for {}", identity.value()),
        });
        info!("Scan accepted for {}: {}", identity, message);
        ScanOutcome::Accepted {
            identity,
            message,
            meal_type: receipt.meal_type,
            new_count: receipt.new_count,
        }
    }

    /// Hide the result and accept codes again after the rearm delay
    pub async fn dismiss(&self) -> Result<()> {
        let (_, revision) = self.transition_tracked(ScanEvent::Dismissed)?;
        tokio::time::sleep(self.rearm_delay).await;

        let mut machine = self.lock();
        if machine.revision() == revision {
            machine.handle(ScanEvent::Rearmed)?;
        } else {
            debug!("Scanner stopped while rearming");
        }
        Ok(())
    }
}
