//! The signal gate and analyzer stage.
//!
//! Per frame, the [`Analyzer`] measures the signal quality, skips frames that
//! are silence, retunes the onset sensitivity to the signal energy, and then
//! asks the tempo, onset, and (optional) pitch estimators for their verdict.
//!
//! The estimators are capabilities behind narrow traits. This crate ships
//! default implementations ([`HfcOnsetDetector`], [`IoiTempoTracker`],
//! [`AutocorrPitchEstimator`]); custom ones can be plugged in with
//! [`Analyzer::with_estimators`].

use crate::config::{EngineConfig, FFT_SIZE_FACTOR};
use crate::error::AnalyzerError;
use crate::frame_accumulator::AnalysisFrame;
use crate::signal_gate::{FrameMetrics, SilenceGate};
use core::fmt::Debug;

pub mod onset;
pub mod pitch;
pub mod tempo;

pub use onset::HfcOnsetDetector;
pub use pitch::AutocorrPitchEstimator;
pub use tempo::IoiTempoTracker;

/// Every n-th frame produces a diagnostic log record.
pub const DIAGNOSTIC_PERIOD: u64 = 200;

/// Construction parameters shared by all estimators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EstimatorParams {
    fft_size: usize,
    frame_len: usize,
    sample_rate: u32,
}

impl EstimatorParams {
    /// Creates validated parameters. The FFT size is derived from the frame
    /// length.
    pub fn new(frame_len: usize, sample_rate: u32) -> Result<Self, AnalyzerError> {
        Self::with_fft_size(frame_len * FFT_SIZE_FACTOR, frame_len, sample_rate)
    }

    /// Creates validated parameters with an explicit FFT size.
    pub fn with_fft_size(
        fft_size: usize,
        frame_len: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalyzerError> {
        if frame_len == 0 {
            return Err(AnalyzerError::ZeroFrameLength);
        }
        if sample_rate == 0 {
            return Err(AnalyzerError::ZeroSampleRate);
        }
        if fft_size < frame_len {
            return Err(AnalyzerError::FftSmallerThanFrame {
                fft_size,
                frame_len,
            });
        }
        Ok(Self {
            fft_size,
            frame_len,
            sample_rate,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AnalyzerError> {
        Self::with_fft_size(config.fft_size(), config.frame_len, config.sample_rate)
    }

    #[must_use]
    pub const fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.frame_len
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Output of a tempo estimator for one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TempoReading {
    /// Current tempo estimate. `0.0` if there is none yet.
    pub bpm: f32,
    /// Trust in `bpm`, in range `[0.0..=1.0]`.
    pub confidence: f32,
}

/// Estimates the tempo of the stream, one frame at a time.
pub trait TempoEstimator: Send + Debug {
    fn process(&mut self, frame: &AnalysisFrame<'_>) -> TempoReading;
}

/// Detects onsets, one frame at a time.
pub trait OnsetDetector: Send + Debug {
    /// Sets the detection threshold used for the following frames. Higher
    /// values require a more pronounced onset.
    fn set_sensitivity(&mut self, threshold: f32);

    /// Returns `true` if the frame contains an onset.
    fn process(&mut self, frame: &AnalysisFrame<'_>) -> bool;
}

/// Estimates the fundamental frequency, one frame at a time.
pub trait PitchEstimator: Send + Debug {
    /// Returns the pitch in Hz, or `None` if the signal has no clear pitch.
    fn process(&mut self, frame: &AnalysisFrame<'_>) -> Option<f32>;
}

/// Result of the analysis of one frame that passed the silence gate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Raw (unsmoothed) tempo estimate.
    pub bpm: f32,
    pub confidence: f32,
    pub onset: bool,
    /// `None` if pitch detection is disabled or the frame has no clear pitch.
    pub pitch_hz: Option<f32>,
}

/// What happened to a frame in the analyzer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The frame was silence; no estimator was invoked.
    Gated(FrameMetrics),
    Analyzed(FrameMetrics, AnalysisResult),
}

/// Silence gate plus estimators.
#[derive(Debug)]
pub struct Analyzer {
    params: EstimatorParams,
    gate: SilenceGate,
    tempo: Box<dyn TempoEstimator>,
    onset: Box<dyn OnsetDetector>,
    pitch: Option<Box<dyn PitchEstimator>>,
}

impl Analyzer {
    /// Creates an analyzer with the default estimators.
    pub fn new(params: EstimatorParams, pitch_detection: bool) -> Result<Self, AnalyzerError> {
        let tempo = Box::new(IoiTempoTracker::new(params));
        let onset = Box::new(HfcOnsetDetector::new(params));
        let pitch = if pitch_detection {
            Some(Box::new(AutocorrPitchEstimator::new(params)?) as Box<dyn PitchEstimator>)
        } else {
            None
        };
        Ok(Self::with_estimators(params, tempo, onset, pitch))
    }

    /// Creates an analyzer with custom estimators.
    pub fn with_estimators(
        params: EstimatorParams,
        tempo: Box<dyn TempoEstimator>,
        onset: Box<dyn OnsetDetector>,
        pitch: Option<Box<dyn PitchEstimator>>,
    ) -> Self {
        Self {
            params,
            gate: SilenceGate::default(),
            tempo,
            onset,
            pitch,
        }
    }

    /// Measures the frame and, unless it is silence, runs all estimators on
    /// it.
    pub fn analyze(&mut self, frame: &AnalysisFrame<'_>) -> FrameOutcome {
        debug_assert_eq!(frame.samples.len(), self.params.frame_len());

        let metrics = FrameMetrics::measure(frame.samples);
        if self.gate.is_gated(&metrics) {
            let number = frame.index + 1;
            if number % DIAGNOSTIC_PERIOD == 0 {
                log::debug!("[SILENCE] Frame #{} (amp: {:.4})", number, metrics.peak);
            }
            return FrameOutcome::Gated(metrics);
        }

        self.onset.set_sensitivity(metrics.onset_threshold);

        let tempo = self.tempo.process(frame);
        let onset = self.onset.process(frame);
        let pitch_hz = self.pitch.as_mut().and_then(|pitch| pitch.process(frame));

        FrameOutcome::Analyzed(
            metrics,
            AnalysisResult {
                bpm: tempo.bpm,
                confidence: tempo.confidence,
                onset,
                pitch_hz,
            },
        )
    }

    #[must_use]
    pub const fn params(&self) -> &EstimatorParams {
        &self.params
    }

    #[must_use]
    pub fn pitch_enabled(&self) -> bool {
        self.pitch.is_some()
    }
}
