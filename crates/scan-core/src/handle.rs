//! Host-side view of a running controller
//!
//! - [`ScannerHandle`]: set the desired activation, shut down, observe state
//! - [`ScannerEvents`]: decoded text and host-facing errors, in order
//! - [`ScannerSnapshot`]: read-only copy of the session state

use crate::device::CameraInfo;
use crate::error::{ControllerError, ScanError};
use crate::state::ScannerStatus;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Event delivered to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerEvent {
    /// An accepted scan; fired at most once per cooldown window
    Decoded(String),
    /// A classified error; never routine decode noise
    Error(ScanError),
}

/// Controller counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScannerStats {
    /// Successful camera opens
    pub starts: u64,
    /// Camera releases, including failed ones
    pub stops: u64,
    /// Decodes forwarded to the host
    pub decodes_accepted: u64,
    /// Decodes discarded during cooldown
    pub decodes_suppressed: u64,
    /// Decode failures swallowed as noise
    pub noise_filtered: u64,
    /// Events from sessions that were already closed
    pub stale_events: u64,
    /// Device events processed, stale ones included
    pub device_events: u64,
}

/// Read-only copy of the session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerSnapshot {
    /// Current status
    pub status: ScannerStatus,
    /// Whether the host wants the camera on
    pub desired_active: bool,
    /// Last surfaced failure, cleared on each successful start
    pub last_error: Option<ScanError>,
    /// End of the current cooldown, present only while cooling down
    pub cooldown_deadline: Option<Instant>,
    /// Camera currently held
    pub camera: Option<CameraInfo>,
    /// Counters
    pub stats: ScannerStats,
}

impl Default for ScannerSnapshot {
    fn default() -> Self {
        Self {
            status: ScannerStatus::Idle,
            desired_active: false,
            last_error: None,
            cooldown_deadline: None,
            camera: None,
            stats: ScannerStats::default(),
        }
    }
}

/// Messages sent to the controller task
#[derive(Debug)]
pub(crate) enum Command {
    SetDesiredActive(bool),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle for driving a controller
///
/// When every handle is dropped the controller tears the session down.
#[derive(Debug, Clone)]
pub struct ScannerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ScannerSnapshot>,
}

impl ScannerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Receiver<ScannerSnapshot>,
    ) -> Self {
        Self { commands, snapshot }
    }

    /// Request the camera on or off
    ///
    /// Returns immediately; the start or stop runs on the controller task.
    ///
    /// # Errors
    /// - `ControllerError::Closed` if the controller has exited
    pub fn set_desired_active(&self, active: bool) -> Result<(), ControllerError> {
        self.commands
            .send(Command::SetDesiredActive(active))
            .map_err(|_| ControllerError::Closed)
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> ScannerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ScannerStatus {
        self.snapshot.borrow().status
    }

    /// Wait until the snapshot satisfies `predicate`
    ///
    /// # Errors
    /// - `ControllerError::Closed` if the controller exits first
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ScannerSnapshot) -> bool,
    ) -> Result<ScannerSnapshot, ControllerError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ControllerError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Wait until the controller reports `status`
    ///
    /// # Errors
    /// - `ControllerError::Closed` if the controller exits first
    pub async fn wait_for_status(&self, status: ScannerStatus) -> Result<ScannerSnapshot, ControllerError> {
        self.wait_for(|s| s.status == status).await
    }

    /// Force the session down and stop the controller task
    ///
    /// Teardown is best-effort; device errors are logged, not reported.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Receiver for [`ScannerEvent`]s
#[derive(Debug)]
pub struct ScannerEvents {
    rx: mpsc::UnboundedReceiver<ScannerEvent>,
}

impl ScannerEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<ScannerEvent>) -> Self {
        Self { rx }
    }

    /// Next event; `None` once the controller has exited and the queue is empty
    pub async fn recv(&mut self) -> Option<ScannerEvent> {
        self.rx.recv().await
    }

    /// Next event if one is queued
    pub fn try_recv(&mut self) -> Option<ScannerEvent> {
        self.rx.try_recv().ok()
    }

    /// Every queued event
    pub fn drain(&mut self) -> Vec<ScannerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
