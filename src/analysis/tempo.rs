//! Module for [`IoiTempoTracker`].

use super::onset::{HfcOnsetDetector, DEFAULT_ONSET_THRESHOLD};
use super::{EstimatorParams, OnsetDetector, TempoEstimator, TempoReading};
use crate::frame_accumulator::AnalysisFrame;
use crate::util;
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

/// Onsets closer than this (240 BPM) are subdivisions and don't count as
/// beats for the tempo.
pub const MIN_BEAT_INTERVAL_SECS: f32 = 0.25;
/// Intervals longer than this (40 BPM) are pauses, not beats.
pub const MAX_BEAT_INTERVAL_SECS: f32 = 1.5;
/// Without any onset for this long, the tempo is forgotten.
pub const TEMPO_TIMEOUT_SECS: f32 = 2.0;
/// Two intervals are consistent if they differ at most this much relative to
/// the median interval.
pub const CONSISTENCY_TOLERANCE: f32 = 0.08;

/// Number of inter-onset intervals the estimate is based on.
const INTERVAL_HISTORY_LEN: usize = 8;

/// Tempo estimator based on inter-onset intervals.
///
/// It runs its own [`HfcOnsetDetector`] with a fixed threshold (independent
/// of the adaptive sensitivity the analyzer applies to the beat onset
/// detector) and keeps the last intervals between onsets. The tempo is the
/// reciprocal of the median interval; the confidence is the share of
/// intervals that agree with the median, damped while only a few intervals
/// are known:
///
/// ```text
/// confidence = consistent / (n + 1)
/// ```
///
/// So one interval never yields a confidence above `0.5`, two consistent
/// intervals yield `0.67`.
#[derive(Debug, Clone)]
pub struct IoiTempoTracker {
    onsets: HfcOnsetDetector,
    sample_rate: f32,
    intervals: ConstGenericRingBuffer<f32, INTERVAL_HISTORY_LEN>,
    last_onset_sample: Option<u64>,
    reading: TempoReading,
}

impl IoiTempoTracker {
    pub fn new(params: EstimatorParams) -> Self {
        Self {
            onsets: HfcOnsetDetector::new(params).with_threshold(DEFAULT_ONSET_THRESHOLD),
            sample_rate: params.sample_rate() as f32,
            intervals: ConstGenericRingBuffer::new(),
            last_onset_sample: None,
            reading: TempoReading::default(),
        }
    }

    /// Seconds between two sample positions.
    fn seconds_between(&self, from: u64, to: u64) -> f32 {
        to.saturating_sub(from) as f32 / self.sample_rate
    }

    fn on_onset(&mut self, position: u64) {
        if let Some(last) = self.last_onset_sample {
            let interval = self.seconds_between(last, position);
            if interval < MIN_BEAT_INTERVAL_SECS {
                // Keep the previous onset as anchor.
                return;
            }
            if interval <= MAX_BEAT_INTERVAL_SECS {
                self.intervals.push(interval);
            }
        }
        self.last_onset_sample = Some(position);
        self.reading = self.estimate();
    }

    fn forget_if_stale(&mut self, position: u64) {
        let Some(last) = self.last_onset_sample else {
            return;
        };
        if self.seconds_between(last, position) > TEMPO_TIMEOUT_SECS {
            log::trace!("no onset for {TEMPO_TIMEOUT_SECS}s, forgetting tempo");
            self.intervals.clear();
            self.last_onset_sample = None;
            self.reading = TempoReading::default();
        }
    }

    /// Computes the reading from the known intervals without allocating.
    fn estimate(&self) -> TempoReading {
        let mut scratch = [0.0_f32; INTERVAL_HISTORY_LEN];
        let n = self.intervals.len();
        scratch
            .iter_mut()
            .zip(self.intervals.iter())
            .for_each(|(dst, src)| *dst = *src);

        let Some(median) = util::median_in_place(&mut scratch[..n]) else {
            return TempoReading::default();
        };

        let consistent = self
            .intervals
            .iter()
            .filter(|&&interval| (interval - median).abs() <= CONSISTENCY_TOLERANCE * median)
            .count();

        TempoReading {
            bpm: 60.0 / median,
            confidence: consistent as f32 / (n + 1) as f32,
        }
    }

    /// Number of intervals the current estimate is based on.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }
}

impl TempoEstimator for IoiTempoTracker {
    fn process(&mut self, frame: &AnalysisFrame<'_>) -> TempoReading {
        let position = frame.first_sample();
        if self.onsets.process(frame) {
            self.on_onset(position);
        } else {
            self.forget_if_stale(position);
        }
        self.reading
    }
}
