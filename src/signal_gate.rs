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
//! Signal-quality metrics of a frame and the silence gate.

use crate::util;

/// Frames whose peak amplitude is below this value are silence (≈ -40 dB).
pub const SILENCE_THRESHOLD: f32 = 0.01;
/// Onset sensitivity for a frame of zero energy.
pub const ADAPTIVE_THRESHOLD_BASE: f32 = 0.15;
/// Growth of the onset sensitivity per unit of RMS energy.
pub const ADAPTIVE_THRESHOLD_RMS_FACTOR: f32 = 0.15;
/// Upper bound of the adaptive onset sensitivity.
pub const ADAPTIVE_THRESHOLD_MAX: f32 = 0.3;

/// Signal-quality metrics of one analysis frame. Computed fresh per frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameMetrics {
    /// Maximum absolute amplitude.
    pub peak: f32,
    /// Root mean square energy.
    pub rms: f32,
    /// Onset sensitivity threshold derived from `rms`.
    pub onset_threshold: f32,
}

impl FrameMetrics {
    /// Measures the given frame.
    #[inline]
    pub fn measure(samples: &[f32]) -> Self {
        let rms = util::rms(samples);
        Self {
            peak: util::peak_amplitude(samples),
            rms,
            onset_threshold: adaptive_onset_threshold(rms),
        }
    }
}

/// Louder signals need a higher bar to avoid false onsets:
/// `base + k * rms`, clamped to [`ADAPTIVE_THRESHOLD_MAX`].
#[inline]
pub fn adaptive_onset_threshold(rms: f32) -> f32 {
    (ADAPTIVE_THRESHOLD_BASE + ADAPTIVE_THRESHOLD_RMS_FACTOR * rms).min(ADAPTIVE_THRESHOLD_MAX)
}

/// Decides whether a frame is worth analyzing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SilenceGate {
    threshold: f32,
}

impl SilenceGate {
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Returns `true` if the frame must be skipped.
    #[inline]
    pub fn is_gated(&self, metrics: &FrameMetrics) -> bool {
        metrics.peak < self.threshold
    }

    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for SilenceGate {
    fn default() -> Self {
        Self::new(SILENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use float_cmp::approx_eq;

    #[test]
    fn metrics_of_silence() {
        let metrics = FrameMetrics::measure(&[0.0; 128]);
        check!(metrics.peak == 0.0);
        check!(metrics.rms == 0.0);
        check!(metrics.onset_threshold == ADAPTIVE_THRESHOLD_BASE);
        check!(SilenceGate::default().is_gated(&metrics));
    }

    #[test]
    fn gate_boundary() {
        let gate = SilenceGate::default();
        check!(gate.is_gated(&FrameMetrics::measure(&[0.0099, -0.005])));
        check!(!gate.is_gated(&FrameMetrics::measure(&[0.0, -0.01])));
        check!(!gate.is_gated(&FrameMetrics::measure(&[0.5; 4])));
    }

    #[test]
    fn adaptive_threshold_grows_with_energy_and_is_clamped() {
        check!(approx_eq!(f32, adaptive_onset_threshold(0.5), 0.225, epsilon = 1e-6));
        check!(adaptive_onset_threshold(0.2) < adaptive_onset_threshold(0.4));
        check!(adaptive_onset_threshold(10.0) == ADAPTIVE_THRESHOLD_MAX);
    }
}
