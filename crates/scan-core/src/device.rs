//! Camera and decode-session collaborators
//!
//! The controller never decodes symbols itself. A [`CameraBackend`]
//! enumerates devices and opens decode sessions; each session reports
//! results through the [`DecodeSink`] it was opened with and is closed via
//! the owned [`SessionHandle`] returned by `open`.

use crate::config::{DecodeConfig, SymbolFormat};
use crate::error::DeviceError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Identifier of one open decode session, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// An enumerated camera
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraInfo {
    /// Backend-specific device id
    pub id: String,
    /// Human-readable label
    pub label: String,
}

impl CameraInfo {
    /// Create camera info
    #[inline]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Result descriptor accompanying decoded text. Not interpreted by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    /// Symbology that produced the text, when the decoder reports it
    pub format: Option<SymbolFormat>,
}

/// Raw event delivered by a decode session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A symbol was decoded
    Decoded {
        /// Decoded text
        text: String,
        /// Decoder metadata
        result: DecodeResult,
    },
    /// A frame failed to decode, or the device reported an error
    Failure {
        /// Decoder-provided message
        message: String,
    },
}

/// Sender handed to a decode session on open
///
/// Every event is tagged with the session it came from so the controller
/// can drop events that arrive after that session was closed.
#[derive(Debug, Clone)]
pub struct DecodeSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, DeviceEvent)>,
}

impl DecodeSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<(SessionId, DeviceEvent)>) -> Self {
        Self { session, tx }
    }

    /// Session this sink reports for
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Report decoded text. Returns `false` once the controller is gone.
    pub fn decoded(&self, text: impl Into<String>, result: DecodeResult) -> bool {
        self.send(DeviceEvent::Decoded {
            text: text.into(),
            result,
        })
    }

    /// Report a decode failure. Returns `false` once the controller is gone.
    pub fn failure(&self, message: impl Into<String>) -> bool {
        self.send(DeviceEvent::Failure {
            message: message.into(),
        })
    }

    /// Controller has dropped its receiver
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: DeviceEvent) -> bool {
        self.tx.send((self.session, event)).is_ok()
    }
}

/// An open decode session
#[async_trait]
pub trait DecodeSession: Send {
    /// Session is still delivering decode attempts
    fn is_decoding(&self) -> bool;

    /// Stop decoding and release the camera
    async fn stop(&mut self) -> Result<(), DeviceError>;
}

/// Owned handle to an open decode session
///
/// Returned by [`CameraBackend::open`] and consumed by [`SessionHandle::close`].
pub struct SessionHandle {
    id: SessionId,
    camera: CameraInfo,
    inner: Box<dyn DecodeSession>,
}

impl SessionHandle {
    /// Wrap a backend session opened with `sink`
    pub fn new(sink: &DecodeSink, camera: CameraInfo, inner: Box<dyn DecodeSession>) -> Self {
        Self {
            id: sink.session(),
            camera,
            inner,
        }
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Camera this session holds
    #[inline]
    #[must_use]
    pub fn camera(&self) -> &CameraInfo {
        &self.camera
    }

    /// Session is still delivering decode attempts
    #[inline]
    #[must_use]
    pub fn is_decoding(&self) -> bool {
        self.inner.is_decoding()
    }

    /// Stop the session if it is decoding, then release it
    ///
    /// # Errors
    /// Whatever the backend reports while stopping; the handle is released
    /// either way.
    pub async fn close(mut self) -> Result<(), DeviceError> {
        if self.inner.is_decoding() {
            self.inner.stop().await
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("camera", &self.camera)
            .field("decoding", &self.inner.is_decoding())
            .finish()
    }
}

/// Device enumeration and decode-session factory
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// List available cameras
    async fn list_cameras(&self) -> Result<Vec<CameraInfo>, DeviceError>;

    /// Open `camera` and begin continuous decode attempts
    ///
    /// The session must report through `sink`; the returned handle is built
    /// from the same sink with [`SessionHandle::new`].
    async fn open(
        &self,
        camera: &CameraInfo,
        config: &DecodeConfig,
        sink: DecodeSink,
    ) -> Result<SessionHandle, DeviceError>;
}
