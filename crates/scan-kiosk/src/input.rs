//! Line-oriented scan input
//!
//! Handheld barcode readers in keyboard-wedge or serial mode deliver one
//! code per line. [`LineInputBackend`] exposes each configured line source
//! as a camera so the scanner controller can drive it like any other
//! device: every non-empty line is a decode, a blank line is a frame with
//! no code in it.
//!
//! A source keeps its read position across sessions. The controller closes
//! and reopens the device after every accepted scan, and reopening must not
//! replay lines that were already read.

use async_trait::async_trait;
use parking_lot::Mutex;
use scan_core::{
    CameraBackend, CameraInfo, DecodeConfig, DecodeResult, DecodeSession, DecodeSink, DeviceError,
    SessionHandle,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Source name for standard input
pub const STDIN_SOURCE: &str = "-";

/// Failure reported for a blank line, worded like the camera decoder's
/// "nothing in this frame" message so it is filtered as noise
pub const BLANK_LINE_MESSAGE: &str = "No MultiFormat Readers were able to detect the code.";

type SourceLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

#[derive(Default)]
struct Shared {
    /// Readers parked between sessions, by source
    parked: Mutex<HashMap<String, SourceLines>>,
    delivered: AtomicU64,
}

/// [`CameraBackend`] reading scans from stdin, files or FIFOs
///
/// Clones share read positions and counters.
#[derive(Clone)]
pub struct LineInputBackend {
    sources: Vec<String>,
    shared: Arc<Shared>,
    exhausted: Arc<watch::Sender<bool>>,
}

impl LineInputBackend {
    /// Backend over `sources`, in preference order
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (exhausted, _) = watch::channel(false);
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            shared: Arc::new(Shared::default()),
            exhausted: Arc::new(exhausted),
        }
    }

    /// Add an already-open stream as a source named `source`
    ///
    /// Serial ports and sockets that are not plain paths are attached this way.
    #[must_use]
    pub fn with_reader<R>(mut self, source: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let source = source.into();
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(BufReader::new(reader));
        self.shared.parked.lock().insert(source.clone(), reader.lines());
        self.sources.push(source);
        self
    }

    /// Configured sources
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Lines handed to the controller so far, blank ones included
    #[must_use]
    pub fn lines_delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Acquire)
    }

    /// Resolve once a source has reached end of input
    pub async fn wait_exhausted(&self) {
        let mut rx = self.exhausted.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|done| *done).await;
    }

    async fn take_reader(&self, source: &str) -> Result<SourceLines, DeviceError> {
        let parked = self.shared.parked.lock().remove(source);
        if let Some(lines) = parked {
            return Ok(lines);
        }

        let reader: Box<dyn AsyncBufRead + Send + Unpin> = if source == STDIN_SOURCE {
            Box::new(BufReader::new(tokio::io::stdin()))
        } else {
            let file = tokio::fs::File::open(source).await?;
            Box::new(BufReader::new(file))
        };
        Ok(reader.lines())
    }
}

impl std::fmt::Debug for LineInputBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineInputBackend")
            .field("sources", &self.sources)
            .field("delivered", &self.lines_delivered())
            .finish_non_exhaustive()
    }
}

fn label(source: &str) -> String {
    if source == STDIN_SOURCE {
        "standard input".to_string()
    } else {
        format!("line input {source}")
    }
}

#[async_trait]
impl CameraBackend for LineInputBackend {
    async fn list_cameras(&self) -> Result<Vec<CameraInfo>, DeviceError> {
        Ok(self
            .sources
            .iter()
            .map(|source| CameraInfo::new(source.clone(), label(source)))
            .collect())
    }

    async fn open(
        &self,
        camera: &CameraInfo,
        config: &DecodeConfig,
        sink: DecodeSink,
    ) -> Result<SessionHandle, DeviceError> {
        let lines = self.take_reader(&camera.id).await?;
        tracing::debug!(
            "Reading scans from {} ({} formats enabled)",
            camera.label,
            config.formats.len()
        );

        let decoding = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = oneshot::channel();
        let pump = LinePump {
            source: camera.id.clone(),
            sink: sink.clone(),
            shared: Arc::clone(&self.shared),
            exhausted: Arc::clone(&self.exhausted),
            decoding: Arc::clone(&decoding),
        };
        let task = tokio::spawn(pump.run(lines, stop_rx));

        let session = LineSession {
            source: camera.id.clone(),
            decoding,
            stop: Some(stop_tx),
            task: Some(task),
        };
        Ok(SessionHandle::new(&sink, camera.clone(), Box::new(session)))
    }
}

struct LinePump {
    source: String,
    sink: DecodeSink,
    shared: Arc<Shared>,
    exhausted: Arc<watch::Sender<bool>>,
    decoding: Arc<AtomicBool>,
}

impl LinePump {
    async fn run(self, mut lines: SourceLines, mut stop: oneshot::Receiver<()>) {
        let mut ended = false;
        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break,
                next = lines.next_line() => match next {
                    Ok(Some(line)) => {
                        self.shared.delivered.fetch_add(1, Ordering::AcqRel);
                        let text = line.trim();
                        let sent = if text.is_empty() {
                            self.sink.failure(BLANK_LINE_MESSAGE)
                        } else {
                            self.sink.decoded(text, DecodeResult::default())
                        };
                        if !sent {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("End of input on {}", self.source);
                        ended = true;
                        break;
                    }
                    Err(err) => {
                        self.shared.delivered.fetch_add(1, Ordering::AcqRel);
                        self.sink.failure(format!("failed to read {}: {}", self.source, err));
                        ended = true;
                        break;
                    }
                },
            }
        }

        // Park before reporting the end so a reopen resumes this reader.
        self.shared.parked.lock().insert(self.source.clone(), lines);
        if ended {
            self.decoding.store(false, Ordering::Release);
            self.exhausted.send_replace(true);
        }
    }
}

struct LineSession {
    source: String,
    decoding: Arc<AtomicBool>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl DecodeSession for LineSession {
    fn is_decoding(&self) -> bool {
        self.decoding.load(Ordering::Acquire)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        self.decoding.store(false, Ordering::Release);
        if let Some(stop) = self.stop.take() {
            // Already gone if the pump hit end of input.
            let _ = stop.send(());
        }
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|err| DeviceError::Io(format!("reader for {} failed: {}", self.source, err))),
            None => Err(DeviceError::Gone(self.source.clone())),
        }
    }
}

impl Drop for LineSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
