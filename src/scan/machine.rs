use std::fmt;

use super::extract::{extract_identity, QrIdentity};
use crate::error::{Error, Result};

/// What the operator is shown after a scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Accepted {
        identity: QrIdentity,
        message: String,
        meal_type: Option<String>,
        new_count: Option<u64>,
    },
    Rejected {
        identity: Option<QrIdentity>,
        message: String,
    },
}

impl ScanOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScanOutcome::Accepted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ScanOutcome::Accepted { message, .. } | ScanOutcome::Rejected { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Scanning,
    Submitting(QrIdentity),
    ShowingResult(ScanOutcome),
    Rearming,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Scanning => "scanning",
            ScanState::Submitting(_) => "submitting",
            ScanState::ShowingResult(_) => "showing result",
            ScanState::Rearming => "rearming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Start,
    /// Raw text from the QR decoder
    Decoded(String),
    Completed(ScanOutcome),
    Dismissed,
    Rearmed,
    Stop,
}

/// What the driver must do after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// Send this identity to the server
    Submit(QrIdentity),
    /// The event was dropped; the state is unchanged
    Ignored,
}

/// Scan workflow: Idle, Scanning, Submitting, ShowingResult, Rearming, back to Scanning
#[derive(Debug, Clone)]
pub struct ScanMachine {
    state: ScanState,
    revision: u64,
}

impl Default for ScanMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanMachine {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            revision: 0,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Bumped on every state change; a follow-up event is only valid for the revision it was issued in
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    pub fn handle(&mut self, event: ScanEvent) -> Result<Effect> {
        let (next, effect) = match (&self.state, event) {
            (_, ScanEvent::Stop) => (ScanState::Idle, Effect::None),
            (ScanState::Idle, ScanEvent::Start) => (ScanState::Scanning, Effect::None),
            (ScanState::Scanning, ScanEvent::Decoded(text)) => match extract_identity(&text) {
                Ok(identity) => (
                    ScanState::Submitting(identity.clone()),
                    Effect::Submit(identity),
                ),
                Err(e) => (
                    ScanState::ShowingResult(ScanOutcome::Rejected {
                        identity: None,
                        message: e.to_string(),
                    }),
                    Effect::None,
                ),
            },
            // Only one code is handled at a time
            (_, ScanEvent::Decoded(_)) => return Ok(Effect::Ignored),
            (ScanState::Submitting(_), ScanEvent::Completed(outcome)) => {
                (ScanState::ShowingResult(outcome), Effect::None)
            }
            (ScanState::ShowingResult(_), ScanEvent::Dismissed) => (ScanState::Rearming, Effect::None),
            (ScanState::Rearming, ScanEvent::Rearmed) => (ScanState::Scanning, Effect::None),
            (state, event) => {
                return Err(Error::InvalidTransition(format!(
                    "{:?} while {}",
                    event, state
                )))
            }
        };
        self.state = next;
        self.revision += 1;
        Ok(effect)
    }
}
