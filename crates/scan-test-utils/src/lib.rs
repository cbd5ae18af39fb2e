//! Testing utilities for the scan kiosk workspace
//!
//! Scriptable fake camera backend, spawn helpers and event assertions.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use scan_core::{
    CameraBackend, CameraInfo, DecodeConfig, DecodeResult, DecodeSession, DecodeSink, DeviceError,
    ScanError, ScannerConfig, ScannerController, ScannerEvent, ScannerEvents, ScannerHandle,
    SessionHandle,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Message the browser decoder emits for every frame without a symbol
pub const NO_CODE_IN_FRAME: &str = "No MultiFormat Readers were able to detect the code.";

#[derive(Debug, Default)]
struct FakeState {
    cameras: Vec<CameraInfo>,
    list_error: Option<DeviceError>,
    open_failures: VecDeque<DeviceError>,
    stop_failures: VecDeque<DeviceError>,
    list_delay: Duration,
    open_delay: Duration,
    stop_delay: Duration,
    sinks: Vec<DecodeSink>,
    opened: Vec<String>,
    last_config: Option<DecodeConfig>,
    list_calls: usize,
    open_calls: usize,
    close_calls: usize,
    open_sessions: usize,
    max_open_sessions: usize,
    in_flight: usize,
    max_in_flight: usize,
}

impl FakeState {
    fn enter_call(&mut self) {
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
    }

    fn exit_call(&mut self) {
        self.in_flight -= 1;
    }

    fn release_session(&mut self) {
        self.open_sessions = self.open_sessions.saturating_sub(1);
    }
}

/// In-memory camera backend
///
/// Clones share state, so a test keeps one clone to script failures and
/// inject decode events while the controller owns the other.
#[derive(Debug, Clone, Default)]
pub struct FakeCameraBackend {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeCameraBackend {
    /// Backend with one camera per id
    #[must_use]
    pub fn with_cameras(ids: &[&str]) -> Self {
        let backend = Self::default();
        backend.set_cameras(ids);
        backend
    }

    /// Backend that enumerates no cameras
    #[must_use]
    pub fn without_cameras() -> Self {
        Self::default()
    }

    pub fn set_cameras(&self, ids: &[&str]) {
        self.inner.lock().cameras = ids
            .iter()
            .map(|id| CameraInfo::new(*id, format!("Fake camera {id}")))
            .collect();
    }

    /// Make every enumeration fail with `err`
    pub fn fail_enumeration(&self, err: DeviceError) {
        self.inner.lock().list_error = Some(err);
    }

    /// Fail the next open with `err`
    pub fn fail_next_open(&self, err: DeviceError) {
        self.inner.lock().open_failures.push_back(err);
    }

    /// Fail the next stop with `err`; the session is still released
    pub fn fail_next_stop(&self, err: DeviceError) {
        self.inner.lock().stop_failures.push_back(err);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.inner.lock().list_delay = delay;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.inner.lock().open_delay = delay;
    }

    pub fn set_stop_delay(&self, delay: Duration) {
        self.inner.lock().stop_delay = delay;
    }

    /// Sink of the most recently opened session
    #[must_use]
    pub fn current_sink(&self) -> Option<DecodeSink> {
        self.inner.lock().sinks.last().cloned()
    }

    /// Sink of the `n`th opened session (0-based)
    #[must_use]
    pub fn sink(&self, n: usize) -> Option<DecodeSink> {
        self.inner.lock().sinks.get(n).cloned()
    }

    /// Deliver decoded text from the current session
    pub fn emit_decoded(&self, text: &str) -> bool {
        self.current_sink()
            .is_some_and(|sink| sink.decoded(text, DecodeResult::default()))
    }

    /// Deliver a decode failure from the current session
    pub fn emit_failure(&self, message: &str) -> bool {
        self.current_sink().is_some_and(|sink| sink.failure(message))
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.inner.lock().list_calls
    }

    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.inner.lock().open_calls
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.inner.lock().close_calls
    }

    /// Sessions opened and not yet released
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.inner.lock().open_sessions
    }

    /// Highest number of sessions ever open at once
    #[must_use]
    pub fn max_open_sessions(&self) -> usize {
        self.inner.lock().max_open_sessions
    }

    /// Highest number of enumerate/open/stop calls ever outstanding at once
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().max_in_flight
    }

    /// Camera ids in open order
    #[must_use]
    pub fn opened_cameras(&self) -> Vec<String> {
        self.inner.lock().opened.clone()
    }

    #[must_use]
    pub fn last_config(&self) -> Option<DecodeConfig> {
        self.inner.lock().last_config.clone()
    }
}

#[async_trait]
impl CameraBackend for FakeCameraBackend {
    async fn list_cameras(&self) -> Result<Vec<CameraInfo>, DeviceError> {
        let delay = {
            let mut state = self.inner.lock();
            state.list_calls += 1;
            state.enter_call();
            state.list_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock();
        state.exit_call();
        match &state.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.cameras.clone()),
        }
    }

    async fn open(
        &self,
        camera: &CameraInfo,
        config: &DecodeConfig,
        sink: DecodeSink,
    ) -> Result<SessionHandle, DeviceError> {
        let delay = {
            let mut state = self.inner.lock();
            state.open_calls += 1;
            state.enter_call();
            state.open_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock();
        state.exit_call();
        if let Some(err) = state.open_failures.pop_front() {
            return Err(err);
        }
        state.open_sessions += 1;
        state.max_open_sessions = state.max_open_sessions.max(state.open_sessions);
        state.opened.push(camera.id.clone());
        state.last_config = Some(config.clone());
        state.sinks.push(sink.clone());
        drop(state);

        let session = FakeSession {
            state: Arc::clone(&self.inner),
            decoding: true,
        };
        Ok(SessionHandle::new(&sink, camera.clone(), Box::new(session)))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    decoding: bool,
}

#[async_trait]
impl DecodeSession for FakeSession {
    fn is_decoding(&self) -> bool {
        self.decoding
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        let delay = {
            let mut state = self.state.lock();
            state.close_calls += 1;
            state.enter_call();
            state.stop_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.exit_call();
        self.decoding = false;
        state.release_session();
        match state.stop_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if self.decoding {
            self.state.lock().release_session();
        }
    }
}

/// Spawn a controller over `backend` with `config`
///
/// # Panics
/// Panics if `config` is invalid.
pub fn spawn_scanner(backend: &FakeCameraBackend, config: ScannerConfig) -> (ScannerHandle, ScannerEvents) {
    ScannerController::spawn(backend.clone(), config).expect("valid scanner config")
}

/// Let every other task run until idle
///
/// Meant for `start_paused` tests: the paused clock only advances once the
/// runtime has nothing else to do.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Decoded texts among queued events
pub fn decoded(events: &mut ScannerEvents) -> Vec<String> {
    split(events).0
}

/// Errors among queued events
pub fn errors(events: &mut ScannerEvents) -> Vec<ScanError> {
    split(events).1
}

/// Queued events split into decoded texts and errors
pub fn split(events: &mut ScannerEvents) -> (Vec<String>, Vec<ScanError>) {
    let mut texts = Vec::new();
    let mut errs = Vec::new();
    for event in events.drain() {
        match event {
            ScannerEvent::Decoded(text) => texts.push(text),
            ScannerEvent::Error(err) => errs.push(err),
        }
    }
    (texts, errs)
}
