/*
MIT License

Copyright (c) 2024 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Module for [`BeatStabilizer`]: turns noisy per-frame estimates into a
//! stable BPM and confirmed beats.

use crate::analysis::AnalysisResult;
use crate::signal_gate::FrameMetrics;
use crate::util;
use core::ops::RangeInclusive;
use core::time::Duration;
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

/// Raw estimates outside this range don't update the smoothed BPM.
pub const PLAUSIBLE_BPM: RangeInclusive<f32> = 60.0..=200.0;
/// Weight of the previous smoothed BPM in the exponential smoothing.
pub const SMOOTHING_FACTOR: f32 = 0.7;
/// A beat needs a tempo confidence above this value.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
/// The BPM is stable if the variance of the stability window is below this
/// value (BPM²).
pub const BPM_VARIANCE_LIMIT: f32 = 5.0;
/// Capacity of the recent confirmed-beat BPM history.
pub const BPM_HISTORY_LEN: usize = 20;
/// Capacity of the window used for the variance.
pub const STABILITY_WINDOW_LEN: usize = 5;

/// A confirmed beat. Emitted once, consumed by the reporter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BeatEvent {
    /// Stream time of the frame that confirmed the beat.
    pub timestamp: Duration,
    /// Smoothed BPM at the time of the beat.
    pub bpm: f32,
    pub confidence: f32,
    pub pitch_hz: Option<f32>,
    /// Peak amplitude of the frame.
    pub amplitude: f32,
    /// Variance (BPM²) of the stability window, including this beat.
    pub variance: f32,
    pub stable: bool,
    /// Average of the recent confirmed-beat BPMs, including this beat.
    pub average_bpm: f32,
}

/// Smoothing, beat confirmation, and stability tracking. Lives as long as
/// the stream; updated on every frame that passed the silence gate.
#[derive(Debug, Clone)]
pub struct BeatStabilizer {
    smoothed_bpm: f32,
    recent_bpms: ConstGenericRingBuffer<f32, BPM_HISTORY_LEN>,
    stability_window: ConstGenericRingBuffer<f32, STABILITY_WINDOW_LEN>,
    last_beat: Option<Duration>,
}

impl BeatStabilizer {
    pub fn new() -> Self {
        Self {
            smoothed_bpm: 0.0,
            recent_bpms: ConstGenericRingBuffer::new(),
            stability_window: ConstGenericRingBuffer::new(),
            last_beat: None,
        }
    }

    /// Consumes the analysis of one frame. Returns a [`BeatEvent`] if the
    /// frame confirms a beat, i.e., it has an onset and the tempo confidence
    /// is above [`CONFIDENCE_THRESHOLD`].
    pub fn update(
        &mut self,
        result: &AnalysisResult,
        metrics: &FrameMetrics,
        timestamp: Duration,
    ) -> Option<BeatEvent> {
        self.smooth(result.bpm);

        if !is_beat(result) {
            return None;
        }

        self.last_beat = Some(timestamp);
        self.recent_bpms.push(self.smoothed_bpm);
        self.stability_window.push(self.smoothed_bpm);

        let variance = self.variance().unwrap_or(0.0);
        Some(BeatEvent {
            timestamp,
            bpm: self.smoothed_bpm,
            confidence: result.confidence,
            pitch_hz: result.pitch_hz,
            amplitude: metrics.peak,
            variance,
            stable: variance < BPM_VARIANCE_LIMIT,
            average_bpm: self.average_bpm().unwrap_or(self.smoothed_bpm),
        })
    }

    /// Exponential smoothing, guarded by the plausible tempo range.
    ///
    /// While no estimate was accepted yet (smoothed BPM is exactly `0.0`), an
    /// implausible but finite raw value is adopted as is.
    // TODO: the bootstrap lets an implausible first estimate seed the
    //  smoothed value. Revisit once there is real-world data on how often
    //  the first estimates are out of range.
    fn smooth(&mut self, raw_bpm: f32) {
        if PLAUSIBLE_BPM.contains(&raw_bpm) {
            self.smoothed_bpm = SMOOTHING_FACTOR * self.smoothed_bpm + (1.0 - SMOOTHING_FACTOR) * raw_bpm;
        } else if self.smoothed_bpm == 0.0 && raw_bpm.is_finite() {
            self.smoothed_bpm = raw_bpm;
        }
    }

    #[must_use]
    pub const fn smoothed_bpm(&self) -> f32 {
        self.smoothed_bpm
    }

    /// Average BPM of the recent confirmed beats. `None` before the first
    /// beat.
    #[must_use]
    pub fn average_bpm(&self) -> Option<f32> {
        util::mean(self.recent_bpms.iter().copied())
    }

    /// Variance of the stability window (BPM²). `None` before the first
    /// beat.
    #[must_use]
    pub fn variance(&self) -> Option<f32> {
        let mut window = [0.0_f32; STABILITY_WINDOW_LEN];
        let n = self.stability_window.len();
        window
            .iter_mut()
            .zip(self.stability_window.iter())
            .for_each(|(dst, src)| *dst = *src);
        util::population_variance(&window[..n])
    }

    /// Whether the variance is below [`BPM_VARIANCE_LIMIT`].
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.variance().is_some_and(|v| v < BPM_VARIANCE_LIMIT)
    }

    #[must_use]
    pub fn recent_bpms(&self) -> &ConstGenericRingBuffer<f32, BPM_HISTORY_LEN> {
        &self.recent_bpms
    }

    #[must_use]
    pub fn stability_window(&self) -> &ConstGenericRingBuffer<f32, STABILITY_WINDOW_LEN> {
        &self.stability_window
    }

    /// Stream time of the last confirmed beat.
    #[must_use]
    pub const fn last_beat(&self) -> Option<Duration> {
        self.last_beat
    }
}

impl Default for BeatStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Onset alone is too noisy, confidence alone doesn't mark the timing.
#[inline]
pub fn is_beat(result: &AnalysisResult) -> bool {
    result.onset && result.confidence > CONFIDENCE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use float_cmp::approx_eq;
    use std::vec::Vec;

    const METRICS: FrameMetrics = FrameMetrics {
        peak: 0.8,
        rms: 0.3,
        onset_threshold: 0.195,
    };

    fn result(bpm: f32, confidence: f32, onset: bool) -> AnalysisResult {
        AnalysisResult {
            bpm,
            confidence,
            onset,
            pitch_hz: None,
        }
    }

    fn beat(bpm: f32) -> AnalysisResult {
        result(bpm, 0.9, true)
    }

    #[test]
    fn smoothing_is_exponential() {
        let mut stabilizer = BeatStabilizer::new();
        stabilizer.smoothed_bpm = 120.0;
        stabilizer.update(&result(130.0, 0.0, false), &METRICS, Duration::ZERO);
        check!(approx_eq!(f32, stabilizer.smoothed_bpm(), 123.0, epsilon = 1e-4));
    }

    #[test]
    fn implausible_estimates_do_not_corrupt_the_smoothed_bpm() {
        let mut stabilizer = BeatStabilizer::new();
        stabilizer.smoothed_bpm = 120.0;
        for raw in [0.0, 59.9, 200.1, 400.0, f32::NAN] {
            stabilizer.update(&result(raw, 0.0, false), &METRICS, Duration::ZERO);
            check!(stabilizer.smoothed_bpm() == 120.0);
        }
    }

    #[test]
    fn bootstrap_adopts_the_first_implausible_estimate() {
        let mut stabilizer = BeatStabilizer::new();
        stabilizer.update(&result(240.0, 0.0, false), &METRICS, Duration::ZERO);
        check!(stabilizer.smoothed_bpm() == 240.0);
        // Only once: the next implausible value is ignored.
        stabilizer.update(&result(30.0, 0.0, false), &METRICS, Duration::ZERO);
        check!(stabilizer.smoothed_bpm() == 240.0);
    }

    #[test]
    fn non_finite_estimates_never_seed_the_smoothed_bpm() {
        let mut stabilizer = BeatStabilizer::new();
        for raw in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            stabilizer.update(&result(raw, 0.0, false), &METRICS, Duration::ZERO);
            check!(stabilizer.smoothed_bpm() == 0.0);
        }
        stabilizer.update(&result(120.0, 0.0, false), &METRICS, Duration::ZERO);
        check!(approx_eq!(f32, stabilizer.smoothed_bpm(), 36.0, epsilon = 1e-4));
    }

    #[test]
    fn beat_needs_onset_and_confidence() {
        let mut stabilizer = BeatStabilizer::new();
        check!(stabilizer.update(&result(120.0, 0.9, false), &METRICS, Duration::ZERO) == None);
        check!(stabilizer.update(&result(120.0, 0.5, true), &METRICS, Duration::ZERO) == None);
        check!(stabilizer.update(&result(120.0, 0.2, true), &METRICS, Duration::ZERO) == None);
        check!(stabilizer.recent_bpms().is_empty());
        check!(stabilizer.last_beat() == None);

        let event = stabilizer
            .update(&result(120.0, 0.51, true), &METRICS, Duration::from_secs(1))
            .unwrap();
        check!(event.confidence == 0.51);
        check!(event.amplitude == 0.8);
        check!(event.timestamp == Duration::from_secs(1));
        check!(stabilizer.last_beat() == Some(Duration::from_secs(1)));
        check!(stabilizer.recent_bpms().len() == 1);
    }

    #[test]
    fn histories_are_bounded_and_evict_the_oldest() {
        let mut stabilizer = BeatStabilizer::new();
        stabilizer.smoothed_bpm = 100.0;
        for _ in 0..BPM_HISTORY_LEN + 1 {
            stabilizer.update(&beat(150.0), &METRICS, Duration::ZERO);
        }
        check!(stabilizer.recent_bpms().len() == BPM_HISTORY_LEN);
        check!(stabilizer.stability_window().len() == STABILITY_WINDOW_LEN);

        // The first smoothed value (115.0) was evicted from both histories.
        let expected_oldest = {
            let mut bpm = 100.0_f32;
            for _ in 0..2 {
                bpm = SMOOTHING_FACTOR * bpm + (1.0 - SMOOTHING_FACTOR) * 150.0;
            }
            bpm
        };
        check!(stabilizer.recent_bpms().iter().next().copied() == Some(expected_oldest));
        let window = stabilizer.stability_window().iter().copied().collect::<Vec<_>>();
        let all = stabilizer.recent_bpms().iter().copied().collect::<Vec<_>>();
        check!(window == all[all.len() - STABILITY_WINDOW_LEN..]);
    }

    #[test]
    fn identical_bpms_are_stable() {
        let mut stabilizer = BeatStabilizer::new();
        stabilizer.smoothed_bpm = 120.0;
        let events = (0..5)
            .filter_map(|_| stabilizer.update(&beat(120.0), &METRICS, Duration::ZERO))
            .collect::<Vec<_>>();
        check!(events.len() == 5);
        check!(stabilizer.variance().unwrap() < 1e-3);
        check!(events.iter().all(|e| e.stable && e.variance < 1e-3));
        check!(approx_eq!(f32, events.last().unwrap().average_bpm, 120.0, epsilon = 1e-3));
    }

    #[test]
    fn spread_bpms_are_unstable() {
        let mut stabilizer = BeatStabilizer::new();
        for bpm in [100.0, 110.0, 120.0, 130.0, 140.0] {
            stabilizer.stability_window.push(bpm);
        }
        // Variance 200 BPM².
        check!(stabilizer.variance() == Some(200.0));
        check!(!stabilizer.is_stable());
    }

    #[test]
    fn average_before_first_beat() {
        let stabilizer = BeatStabilizer::new();
        check!(stabilizer.average_bpm() == None);
        check!(stabilizer.variance() == None);
        check!(!stabilizer.is_stable());
    }
}
