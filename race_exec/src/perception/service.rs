//! Perception service

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use log::{info, warn};

use super::{select_detection, Detection, Params};
use crate::{
    interface::{BackendError, GateDetector},
    mailbox::{mailbox, MailboxReceiver},
    poll_loop::PollLoop,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of one perception cycle.
#[derive(Debug, Copy, Clone)]
pub struct DetectionSnapshot {
    /// When the frame was processed
    pub acquired: Instant,

    /// The selected detection, `None` if no gate was selected in the frame
    pub detection: Option<Detection>,
}

/// Owns the gate detector for the lifetime of the process and runs it in a polling loop while
/// an episode is being flown.
pub struct PerceptionService {
    detector: Arc<Mutex<Box<dyn GateDetector + Send>>>,

    params: Params,

    poll: Option<PollLoop>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PerceptionError {
    #[error("The perception loop is already running")]
    AlreadyRunning,

    #[error("Could not spawn the perception loop: {0}")]
    SpawnError(std::io::Error),

    #[error("The detector mutex was poisoned")]
    DetectorPoisoned,

    #[error("Detector error: {0}")]
    Detector(BackendError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetectionSnapshot {
    /// Age of the snapshot.
    pub fn age(&self) -> Duration {
        self.acquired.elapsed()
    }

    /// The detection if the snapshot is younger than `max_age`.
    pub fn fresh(&self, max_age: Duration) -> Option<Detection> {
        match self.age() <= max_age {
            true => self.detection,
            false => None,
        }
    }
}

impl PerceptionService {
    pub fn new(detector: Box<dyn GateDetector + Send>, params: Params) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
            params,
            poll: None,
        }
    }

    /// Acquire one frame and select a detection from it, in the calling thread.
    pub fn detect_once(&self) -> Result<Option<Detection>, PerceptionError> {
        let mut detector = self.detector.lock()
            .map_err(|_| PerceptionError::DetectorPoisoned)?;

        let frame = detector.detect().map_err(PerceptionError::Detector)?;

        Ok(select_detection(&frame.boxes, &self.params))
    }

    /// Start polling the detector with the given period.
    ///
    /// Returns the mailbox the snapshots are published in. Detector errors are logged and the
    /// cycle skipped, so a failing detector leaves the last snapshot to go stale.
    pub fn start(
        &mut self,
        period: Duration
    ) -> Result<MailboxReceiver<DetectionSnapshot>, PerceptionError> {
        if self.is_running() {
            return Err(PerceptionError::AlreadyRunning);
        }

        let (tx, rx) = mailbox();
        let detector = self.detector.clone();
        let params = self.params.clone();

        let poll = PollLoop::spawn("perception", period, move || {
            let frame = match detector.lock() {
                Ok(mut d) => d.detect(),
                Err(_) => {
                    warn!("Detector mutex poisoned, skipping perception cycle");
                    return;
                }
            };

            match frame {
                Ok(f) => {
                    tx.publish(DetectionSnapshot {
                        acquired: Instant::now(),
                        detection: select_detection(&f.boxes, &params),
                    });
                }
                Err(e) => warn!("Gate detection failed: {}", e),
            }
        }).map_err(PerceptionError::SpawnError)?;

        info!("Perception loop started with a {:.03} s period", period.as_secs_f64());

        self.poll = Some(poll);

        Ok(rx)
    }

    /// Stop the polling loop, waiting for the current cycle to finish.
    pub fn stop(&mut self) {
        if let Some(mut poll) = self.poll.take() {
            poll.stop();
            info!("Perception loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.poll.as_ref().map(|p| p.is_running()).unwrap_or(false)
    }
}
