//! Scanner lifecycle controller
//!
//! A single tokio task owns the session and processes, in this order of
//! priority:
//! - host commands (desired activation, shutdown)
//! - device events (decoded text, decode failures)
//! - the cooldown timer
//!
//! Start, stop and restart sequences run to completion inside the task
//! before the next message is read, so at most one is ever in flight.
//! Requests that arrive meanwhile queue up and are reconciled afterwards.

use crate::classify::classify_decode_failure;
use crate::config::{DecodeConfig, ScannerConfig};
use crate::device::{CameraBackend, CameraInfo, DecodeSink, DeviceEvent, SessionHandle, SessionId};
use crate::error::{ConfigError, DeviceError, ErrorKind, ScanError};
use crate::handle::{Command, ScannerEvent, ScannerEvents, ScannerHandle, ScannerSnapshot, ScannerStats};
use crate::state::{validate_transition, ScannerStatus};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Entry point for spawning controllers
#[derive(Debug, Clone, Copy, Default)]
pub struct ScannerController;

impl ScannerController {
    /// Spawn a controller task on the current tokio runtime
    ///
    /// The session starts `Idle`; nothing is opened until the host calls
    /// [`ScannerHandle::set_desired_active`] with `true`.
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if `config` fails validation
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn<B>(backend: B, config: ScannerConfig) -> Result<(ScannerHandle, ScannerEvents), ConfigError>
    where
        B: CameraBackend + 'static,
    {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (device_tx, device_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ScannerSnapshot::default());

        let task = ControllerTask {
            decode_config: config.decode_config(),
            config,
            backend: Box::new(backend),
            session: ScannerSession::default(),
            stats: ScannerStats::default(),
            remembered_camera: None,
            next_session: 0,
            commands: command_rx,
            device_tx,
            device_rx,
            events: event_tx,
            snapshot: snapshot_tx,
        };
        tokio::spawn(task.run());

        Ok((
            ScannerHandle::new(command_tx, snapshot_rx),
            ScannerEvents::new(event_rx),
        ))
    }
}

/// Per-session state, owned exclusively by the controller task
#[derive(Debug)]
struct ScannerSession {
    status: ScannerStatus,
    desired_active: bool,
    device: Option<SessionHandle>,
    last_error: Option<ScanError>,
    cooldown_deadline: Option<Instant>,
}

impl Default for ScannerSession {
    fn default() -> Self {
        Self {
            status: ScannerStatus::Idle,
            desired_active: false,
            device: None,
            last_error: None,
            cooldown_deadline: None,
        }
    }
}

struct ControllerTask {
    config: ScannerConfig,
    decode_config: DecodeConfig,
    backend: Box<dyn CameraBackend>,
    session: ScannerSession,
    stats: ScannerStats,
    remembered_camera: Option<String>,
    next_session: u64,
    commands: mpsc::UnboundedReceiver<Command>,
    device_tx: mpsc::UnboundedSender<(SessionId, DeviceEvent)>,
    device_rx: mpsc::UnboundedReceiver<(SessionId, DeviceEvent)>,
    events: mpsc::UnboundedSender<ScannerEvent>,
    snapshot: watch::Sender<ScannerSnapshot>,
}

impl ControllerTask {
    async fn run(mut self) {
        tracing::debug!("Scanner controller running");

        loop {
            let deadline = self.session.cooldown_deadline;
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::SetDesiredActive(active)) => self.set_desired_active(active).await,
                    Some(Command::Shutdown(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some((session, event)) = self.device_rx.recv() => {
                    self.handle_device_event(session, event).await;
                }
                () = cooldown_elapsed(deadline) => self.finish_cooldown().await,
            }
        }

        tracing::debug!("Scanner controller exited");
    }

    async fn set_desired_active(&mut self, active: bool) {
        if self.session.desired_active == active {
            tracing::trace!("Desired activation already {}", active);
            return;
        }
        self.session.desired_active = active;
        self.publish();

        if active {
            self.start().await;
        } else {
            self.stop().await;
        }
    }

    /// Start sequence: enumerate, open, run
    async fn start(&mut self) {
        let status = self.session.status;
        if status.is_transitional() || status.is_active() {
            tracing::debug!("Start ignored while {}", status);
            return;
        }

        self.session.last_error = None;
        self.enter(ScannerStatus::Starting);
        self.acquire().await;
    }

    async fn acquire(&mut self) {
        let cameras = match self.backend.list_cameras().await {
            Ok(cameras) => cameras,
            Err(err) => return self.fail(ScanError::CameraUnavailable(err)),
        };
        let Some(camera) = self.choose_camera(&cameras) else {
            return self.fail(ScanError::NoCameraFound);
        };

        self.next_session += 1;
        let sink = DecodeSink::new(SessionId(self.next_session), self.device_tx.clone());
        let session = sink.session();

        match self.backend.open(&camera, &self.decode_config, sink).await {
            Ok(handle) => {
                if self.config.remember_last_camera {
                    self.remembered_camera = Some(camera.id.clone());
                }
                self.session.device = Some(handle);
                self.session.last_error = None;
                self.stats.starts += 1;
                tracing::info!("Scanner started on camera {} ({})", camera.id, session);
                self.enter(ScannerStatus::Running);
            }
            Err(err) => self.fail(ScanError::CameraUnavailable(err)),
        }
    }

    fn choose_camera(&self, cameras: &[CameraInfo]) -> Option<CameraInfo> {
        let remembered = self
            .remembered_camera
            .as_deref()
            .filter(|_| self.config.remember_last_camera)
            .and_then(|id| cameras.iter().find(|c| c.id == id));
        remembered.or_else(|| cameras.first()).cloned()
    }

    /// Stop sequence: always ends `Idle`
    async fn stop(&mut self) {
        let status = self.session.status;
        if status == ScannerStatus::Idle || status.is_transitional() {
            tracing::debug!("Stop ignored while {}", status);
            return;
        }

        self.enter(ScannerStatus::Stopping);
        if let Err(err) = self.release_device().await {
            self.report(ScanError::StopFailed(err));
        }
        self.session.last_error = None;
        self.enter(ScannerStatus::Idle);
        tracing::info!("Scanner stopped");
    }

    /// Stop then start as one logical operation
    async fn restart(&mut self) {
        tracing::debug!("Cooldown ended, restarting scanner");
        self.enter(ScannerStatus::Starting);

        if let Err(err) = self.release_device().await {
            self.report(ScanError::StopFailed(err));
        }

        let delay = self.config.restart_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.session.last_error = None;
        self.acquire().await;
    }

    /// Host gone: force the camera off, swallowing errors
    async fn teardown(&mut self) {
        self.session.desired_active = false;
        if self.session.status == ScannerStatus::Idle {
            return;
        }

        self.enter(ScannerStatus::Stopping);
        if let Err(err) = self.release_device().await {
            tracing::warn!("Error releasing camera on teardown: {}", err);
        }
        self.session.last_error = None;
        self.enter(ScannerStatus::Idle);
        tracing::info!("Scanner torn down");
    }

    async fn release_device(&mut self) -> Result<(), DeviceError> {
        let Some(handle) = self.session.device.take() else {
            return Ok(());
        };
        self.stats.stops += 1;

        let session = handle.id();
        let result = handle.close().await;
        tracing::debug!("Released {} (clean: {})", session, result.is_ok());
        result
    }

    async fn handle_device_event(&mut self, session: SessionId, event: DeviceEvent) {
        self.stats.device_events += 1;
        let current = self.session.device.as_ref().map(SessionHandle::id);
        if current != Some(session) {
            self.stats.stale_events += 1;
            tracing::debug!("Dropping event from closed {}", session);
            self.publish();
            return;
        }

        match event {
            DeviceEvent::Decoded { text, .. } => self.on_decoded(text),
            DeviceEvent::Failure { message } => self.on_decode_failure(message).await,
        }
    }

    fn on_decoded(&mut self, text: String) {
        match self.session.status {
            ScannerStatus::CoolingDown => {
                self.stats.decodes_suppressed += 1;
                tracing::debug!("Scan during cooldown ignored: {}", text);
                self.publish();
            }
            ScannerStatus::Running => {
                self.stats.decodes_accepted += 1;
                tracing::info!("Scan accepted: {}", text);
                self.emit(ScannerEvent::Decoded(text));

                self.session.cooldown_deadline = Some(Instant::now() + self.config.cooldown());
                self.enter(ScannerStatus::CoolingDown);
            }
            status => {
                tracing::debug!("Scan while {} ignored", status);
                self.publish();
            }
        }
    }

    async fn on_decode_failure(&mut self, message: String) {
        match classify_decode_failure(&message) {
            ErrorKind::DecodeNoise => {
                self.stats.noise_filtered += 1;
                tracing::trace!("Decode noise: {}", message);
                self.publish();
            }
            ErrorKind::CriticalDecodeError => {
                if let Err(err) = self.release_device().await {
                    tracing::debug!("Release after critical decode error failed: {}", err);
                }
                self.fail(ScanError::CriticalDecode(message));
            }
            _ => {
                self.report(ScanError::DecodeFailure(message));
                self.publish();
            }
        }
    }

    async fn finish_cooldown(&mut self) {
        self.session.cooldown_deadline = None;
        if self.session.status != ScannerStatus::CoolingDown {
            return;
        }

        if self.session.desired_active {
            self.restart().await;
        } else {
            self.stop().await;
        }
    }

    /// Record a fatal error and enter `Failed`. The device must already be released.
    fn fail(&mut self, err: ScanError) {
        tracing::warn!("Scanner failed: {}", err);
        self.session.last_error = Some(err.clone());
        self.enter(ScannerStatus::Failed);
        self.emit(ScannerEvent::Error(err));
    }

    /// Surface a non-fatal error without changing status
    fn report(&mut self, err: ScanError) {
        tracing::warn!("Scanner error: {}", err);
        self.emit(ScannerEvent::Error(err));
    }

    fn enter(&mut self, to: ScannerStatus) {
        let from = self.session.status;
        if let Err(err) = validate_transition(from, to) {
            tracing::error!("{}; forcing", err);
        }

        self.session.status = to;
        if to != ScannerStatus::CoolingDown {
            self.session.cooldown_deadline = None;
        }
        tracing::debug!("Scanner {} -> {}", from, to);
        self.publish();
    }

    fn emit(&self, event: ScannerEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Host dropped the event receiver");
        }
    }

    fn publish(&self) {
        let session = &self.session;
        self.snapshot.send_replace(ScannerSnapshot {
            status: session.status,
            desired_active: session.desired_active,
            last_error: session.last_error.clone(),
            cooldown_deadline: session.cooldown_deadline,
            camera: session.device.as_ref().map(|d| d.camera().clone()),
            stats: self.stats,
        });
    }
}

async fn cooldown_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
