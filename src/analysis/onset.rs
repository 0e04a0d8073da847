//! Module for [`HfcOnsetDetector`].

use super::{EstimatorParams, OnsetDetector};
use crate::frame_accumulator::AnalysisFrame;
use crate::util;
use core::time::Duration;
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

/// Initial detection threshold.
pub const DEFAULT_ONSET_THRESHOLD: f32 = 0.2;
/// Two onsets are at least this far apart.
pub const DEFAULT_MIN_INTER_ONSET: Duration = Duration::from_millis(25);
/// Frames quieter than this (RMS, dBFS) never contain an onset.
pub const DEFAULT_SILENCE_DBFS: f32 = -45.0;

/// Number of previous detection function values the current one is
/// compared against.
const HISTORY_LEN: usize = 16;

/// Onset detector based on the high-frequency content of a frame.
///
/// The detection function is the energy of the first difference of the
/// signal, which weights spectral content by frequency. Percussive attacks
/// are broadband and therefore produce a sharp rise while sustained tones
/// barely change it. An onset is reported when the relative rise over the
/// mean of the last frames exceeds the threshold:
///
/// ```text
/// (hfc - mean(previous)) / hfc > threshold
/// ```
///
/// Frames that never reached the detector (skipped by the silence gate) are
/// treated as silence, so the first loud frame after a pause is an onset.
#[derive(Debug, Clone)]
pub struct HfcOnsetDetector {
    threshold: f32,
    silence_dbfs: f32,
    min_interval_samples: u64,
    history: ConstGenericRingBuffer<f32, HISTORY_LEN>,
    /// Last sample of the previous frame, for a continuous first difference.
    previous_sample: f32,
    last_frame: Option<u64>,
    last_onset_sample: Option<u64>,
}

impl HfcOnsetDetector {
    pub fn new(params: EstimatorParams) -> Self {
        let mut this = Self {
            threshold: DEFAULT_ONSET_THRESHOLD,
            silence_dbfs: DEFAULT_SILENCE_DBFS,
            min_interval_samples: 0,
            history: ConstGenericRingBuffer::new(),
            previous_sample: 0.0,
            last_frame: None,
            last_onset_sample: None,
        };
        this.set_min_interval(DEFAULT_MIN_INTER_ONSET, params.sample_rate());
        this
    }

    /// Builder-style variant of [`OnsetDetector::set_sensitivity`].
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the silence floor in dBFS.
    #[must_use]
    pub fn with_silence_dbfs(mut self, silence_dbfs: f32) -> Self {
        self.silence_dbfs = silence_dbfs;
        self
    }

    fn set_min_interval(&mut self, interval: Duration, sample_rate: u32) {
        self.min_interval_samples = (interval.as_secs_f64() * sample_rate as f64).round() as u64;
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Pushes one silent history entry per frame that was never seen.
    fn account_for_skipped_frames(&mut self, index: u64) {
        let Some(last) = self.last_frame else {
            return;
        };
        let skipped = index.saturating_sub(last + 1).min(HISTORY_LEN as u64);
        if skipped > 0 {
            (0..skipped).for_each(|_| self.history.push(0.0));
            self.previous_sample = 0.0;
        }
    }

    /// High-frequency content of the frame.
    fn detection_function(&mut self, samples: &[f32]) -> f32 {
        let mut previous = self.previous_sample;
        let hfc = samples
            .iter()
            .map(|&sample| {
                let diff = sample - previous;
                previous = sample;
                diff * diff
            })
            .sum::<f32>();
        self.previous_sample = previous;
        hfc
    }
}

impl OnsetDetector for HfcOnsetDetector {
    fn set_sensitivity(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    fn process(&mut self, frame: &AnalysisFrame<'_>) -> bool {
        self.account_for_skipped_frames(frame.index);
        self.last_frame = Some(frame.index);

        let hfc = self.detection_function(frame.samples);
        let previous_mean = util::mean(self.history.iter().copied()).unwrap_or(0.0);
        self.history.push(hfc);

        if hfc <= f32::EPSILON {
            return false;
        }
        if util::rms_to_dbfs(util::rms(frame.samples)) < self.silence_dbfs {
            return false;
        }

        let rise = (hfc - previous_mean) / hfc;
        if rise <= self.threshold {
            return false;
        }

        let position = frame.first_sample();
        if let Some(last) = self.last_onset_sample {
            if position.saturating_sub(last) < self.min_interval_samples {
                return false;
            }
        }
        self.last_onset_sample = Some(position);
        true
    }
}
