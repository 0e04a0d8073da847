//! Error types of the engine. The taxonomy follows the lifecycle: usage
//! errors happen before anything is touched, startup errors abort before
//! the engine runs, sink errors are recovered locally.

use crate::lifecycle::LifecycleState;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Invalid parameters for the signal-analysis estimators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    #[error("frame length must not be zero")]
    ZeroFrameLength,
    #[error("sample rate must not be zero")]
    ZeroSampleRate,
    #[error("FFT size ({fft_size}) must be at least the frame length ({frame_len})")]
    FftSmallerThanFrame { fft_size: usize, frame_len: usize },
    #[error("a window of {window_len} samples at {sample_rate} Hz can't resolve any pitch")]
    PitchRangeUnavailable { window_len: usize, sample_rate: u32 },
    #[error("invalid pre-filter parameters")]
    InvalidFilter,
}

/// Fatal failure before the engine enters the running state.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The audio subsystem could not be reached.
    #[error("audio subsystem unavailable: {0}")]
    SubsystemUnavailable(String),
    /// There was no audio device provided and no default device can be found.
    #[error("no audio input device available")]
    NoInputDevice,
    /// The device can't deliver the requested stream format.
    #[error("unsupported stream format: {0}")]
    UnsupportedFormat(String),
    /// Connecting or starting the input stream failed.
    #[error("failed to connect the input stream")]
    Connect(#[source] Box<dyn StdError + Send + Sync>),
    /// The tempo, onset, or pitch estimator could not be constructed.
    #[error("failed to construct the signal analyzer")]
    Analyzer(#[from] AnalyzerError),
}

/// Invalid command line. Holds the rendered message including usage text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// A sink couldn't deliver a beat event.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error in sink")]
    Io(#[from] io::Error),
}

/// A lifecycle transition that skips a state or leaves `Terminated`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Failure of a whole run as seen by the lifecycle controller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Lifecycle(#[from] InvalidTransition),
    /// The capture session did not return the engine after shutdown, so no
    /// statistics are available.
    #[error("the capture session did not hand back the engine")]
    EngineLost,
}
