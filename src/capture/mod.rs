//! The boundary to the audio subsystem.
//!
//! An [`AudioSource`] connects one mono input stream and drives a
//! [`BeatEngine`] from its real-time callback. The engine is moved into the
//! callback inside an [`EngineHandBack`]; when the stream is destroyed, the
//! callback (and with it the guard) is dropped and the engine travels back
//! to the lifecycle controller through a channel. Nothing is shared with the
//! callback except the lock-free [`StopFlag`].

use crate::config::EngineConfig;
use crate::engine::{BeatEngine, BlockStatus};
use crate::error::StartupError;
use crate::lifecycle::StopFlag;
use core::fmt::{self, Display, Formatter};
use core::time::Duration;
use std::sync::mpsc::{self, Receiver, Sender};

#[cfg(feature = "recording")]
pub mod cpal_source;

#[cfg(feature = "recording")]
pub use cpal_source::{CaptureError, CpalSource};

/// Requested stream format. Samples are always 32-bit float.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "f32, {} ch, {} Hz", self.channels, self.sample_rate)
    }
}

/// State of the input stream as reported by the audio subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Unconnected,
    Connecting,
    Paused,
    Streaming,
    Error(String),
}

impl Display for StreamState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => f.write_str("unconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Paused => f.write_str("paused"),
            Self::Streaming => f.write_str("streaming"),
            Self::Error(e) => write!(f, "error ({e})"),
        }
    }
}

/// Logs a state transition of the stream. An error state requests the stop
/// of the pipeline; it never raises.
pub fn report_state_change(old: &StreamState, new: &StreamState, stop: &StopFlag) {
    match new {
        StreamState::Error(_) => {
            log::error!("Stream state: {old} -> {new}");
            stop.request();
        }
        _ => log::info!("Stream state: {old} -> {new}"),
    }
}

/// A connected input stream. Dropping it releases the stream, too, but
/// without handing back the engine.
pub trait CaptureSession {
    /// Stops and releases the stream and returns the engine that was driven
    /// by it. `None` if the engine got lost, e.g., because the callback
    /// thread panicked.
    fn close(self) -> Option<BeatEngine>;
}

/// Something that can deliver audio blocks to a [`BeatEngine`].
pub trait AudioSource {
    type Session: CaptureSession;

    /// Connects one input stream with the given format and starts driving
    /// `engine` with it. Failures are fatal and not retried.
    fn connect(
        &mut self,
        format: StreamFormat,
        engine: BeatEngine,
        stop: StopFlag,
    ) -> Result<Self::Session, StartupError>;
}

/// Owns the engine inside the audio callback. Sends the engine back when
/// dropped.
#[derive(Debug)]
pub struct EngineHandBack {
    engine: Option<BeatEngine>,
    tx: Sender<BeatEngine>,
}

impl EngineHandBack {
    /// Wraps the engine. The [`EngineReturn`] receives it once the guard is
    /// dropped.
    pub fn new(engine: BeatEngine) -> (Self, EngineReturn) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                engine: Some(engine),
                tx,
            },
            EngineReturn { rx },
        )
    }

    /// Feeds one audio block to the engine.
    #[inline]
    pub fn process_block(&mut self, block: &[f32]) -> BlockStatus {
        match self.engine.as_mut() {
            Some(engine) => engine.process_block(block),
            None => BlockStatus::Stopped,
        }
    }
}

impl Drop for EngineHandBack {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            // The receiver is gone if the controller gave up waiting.
            let _ = self.tx.send(engine);
        }
    }
}

/// Receiving end of an [`EngineHandBack`].
#[derive(Debug)]
pub struct EngineReturn {
    rx: Receiver<BeatEngine>,
}

impl EngineReturn {
    /// Waits for the engine. `None` if the guard was lost without sending
    /// it or it took longer than `timeout`.
    pub fn wait(self, timeout: Duration) -> Option<BeatEngine> {
        self.rx.recv_timeout(timeout).ok()
    }
}
