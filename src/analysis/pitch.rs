//! Module for [`AutocorrPitchEstimator`].

use super::{EstimatorParams, PitchEstimator};
use crate::error::AnalyzerError;
use crate::frame_accumulator::AnalysisFrame;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use ringbuffer::{AllocRingBuffer, RingBuffer};

/// Lowest detectable pitch.
pub const MIN_PITCH_HZ: f32 = 50.0;
/// Highest detectable pitch.
pub const MAX_PITCH_HZ: f32 = 1000.0;
/// Below this normalized correlation the signal has no clear pitch.
pub const VOICING_THRESHOLD: f32 = 0.5;

/// Upper bound of the analysis window. Keeps the cost per frame bounded for
/// large frame lengths.
const MAX_WINDOW_LEN: usize = 2048;
/// The pitch is re-estimated at most once per this many samples; frames in
/// between get the previous estimate.
const MIN_HOP_LEN: usize = 512;
/// Cutoff of the pre-filter that removes harmonics and noise above the
/// detectable range.
const PRE_FILTER_CUTOFF_HZ: f32 = 1200.0;
/// The first lag whose correlation reaches this share of the maximum wins.
/// Prevents octave errors (the period repeats at every multiple of it).
const FIRST_PEAK_RATIO: f32 = 0.9;

/// Pitch estimator based on the normalized autocorrelation of the most recent
/// `min(fft_size, 2048)` samples.
///
/// The input passes through a lowpass filter first. The pitch is the sample
/// rate divided by the first lag (refined by parabolic interpolation) whose
/// correlation is a local maximum close to the global maximum.
///
/// The correlation is expensive, so for short frames it is only evaluated
/// every [`MIN_HOP_LEN`] samples. Please note that the lowpass filter
/// introduces a short group delay.
#[derive(Debug)]
pub struct AutocorrPitchEstimator {
    filter: DirectForm2Transposed<f32>,
    window: AllocRingBuffer<f32>,
    /// Linearized copy of `window`.
    scratch: Box<[f32]>,
    /// Correlation per lag; index == lag.
    correlation: Box<[f32]>,
    min_lag: usize,
    max_lag: usize,
    sample_rate: f32,
    hop_len: usize,
    /// Samples since the last evaluation.
    pending: usize,
    last_estimate: Option<f32>,
}

impl AutocorrPitchEstimator {
    pub fn new(params: EstimatorParams) -> Result<Self, AnalyzerError> {
        let sample_rate = params.sample_rate() as f32;
        let window_len = params.fft_size().min(MAX_WINDOW_LEN);
        let min_lag = ((sample_rate / MAX_PITCH_HZ).floor() as usize).max(2);
        let max_lag = ((sample_rate / MIN_PITCH_HZ).ceil() as usize).min(window_len / 2);
        if min_lag + 2 > max_lag {
            return Err(AnalyzerError::PitchRangeUnavailable {
                window_len,
                sample_rate: params.sample_rate(),
            });
        }

        let coefficients = Coefficients::<f32>::from_params(
            Type::LowPass,
            sample_rate.hz(),
            PRE_FILTER_CUTOFF_HZ.min(sample_rate / 2.0 - 1.0).hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|_| AnalyzerError::InvalidFilter)?;

        let hop_len = params.frame_len().max(MIN_HOP_LEN);
        Ok(Self {
            filter: DirectForm2Transposed::<f32>::new(coefficients),
            window: AllocRingBuffer::new(window_len),
            scratch: vec![0.0; window_len].into_boxed_slice(),
            correlation: vec![0.0; max_lag + 2].into_boxed_slice(),
            min_lag,
            max_lag,
            sample_rate,
            hop_len,
            // The first full window is evaluated right away.
            pending: hop_len,
            last_estimate: None,
        })
    }

    /// Normalized autocorrelation of `scratch` at `lag`.
    fn normalized_correlation(x: &[f32], lag: usize) -> f32 {
        let (mut cross, mut energy_head, mut energy_tail) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in x.iter().zip(&x[lag..]) {
            cross += a * b;
            energy_head += a * a;
            energy_tail += b * b;
        }
        let norm = (energy_head * energy_tail).sqrt();
        if norm <= f32::EPSILON {
            0.0
        } else {
            cross / norm
        }
    }

    /// Returns the lag of the first peak with a refined, fractional lag.
    fn find_period(&mut self) -> Option<f32> {
        for lag in self.min_lag - 1..=self.max_lag + 1 {
            self.correlation[lag] = Self::normalized_correlation(&self.scratch, lag);
        }
        let r = &self.correlation;

        let global_max = r[self.min_lag..=self.max_lag]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);
        if global_max < VOICING_THRESHOLD {
            return None;
        }

        let lag = (self.min_lag..=self.max_lag).find(|&lag| {
            r[lag] >= FIRST_PEAK_RATIO * global_max && r[lag] >= r[lag - 1] && r[lag] >= r[lag + 1]
        })?;

        let (left, mid, right) = (r[lag - 1], r[lag], r[lag + 1]);
        let denominator = left - 2.0 * mid + right;
        let offset = if denominator.abs() > f32::EPSILON {
            (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        Some(lag as f32 + offset)
    }
}

impl PitchEstimator for AutocorrPitchEstimator {
    fn process(&mut self, frame: &AnalysisFrame<'_>) -> Option<f32> {
        for &sample in frame.samples {
            self.window.push(self.filter.run(sample));
        }
        if !self.window.is_full() {
            return None;
        }
        self.pending += frame.samples.len();
        if self.pending < self.hop_len {
            return self.last_estimate;
        }
        self.pending = 0;

        self.scratch
            .iter_mut()
            .zip(self.window.iter())
            .for_each(|(dst, src)| *dst = *src);

        self.last_estimate = self.find_period().map(|period| self.sample_rate / period);
        self.last_estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::signals;
    use assert2::check;

    fn estimate(frame_len: usize, samples: &[f32]) -> Option<f32> {
        let params = EstimatorParams::new(frame_len, 44100).unwrap();
        let mut estimator = AutocorrPitchEstimator::new(params).unwrap();
        samples
            .chunks_exact(frame_len)
            .enumerate()
            .map(|(i, samples)| {
                estimator.process(&AnalysisFrame {
                    index: i as u64,
                    samples,
                })
            })
            .last()
            .flatten()
    }

    #[test]
    fn detects_sine_pitch() {
        for frequency in [110.0, 220.0, 440.0, 880.0] {
            let tone = signals::sine(frequency, 0.5, 44100, 44100 / 2);
            let pitch = estimate(256, &tone).unwrap();
            check!(
                (pitch - frequency).abs() < frequency * 0.02,
                "expected {} Hz, got {} Hz",
                frequency,
                pitch
            );
        }
    }

    #[test]
    fn no_pitch_until_window_is_full() {
        let tone = signals::sine(440.0, 0.5, 44100, 128);
        check!(estimate(128, &tone) == None);
    }

    #[test]
    fn silence_has_no_pitch() {
        check!(estimate(128, &[0.0; 44100]) == None);
    }

    #[test]
    fn small_window_limits_the_range() {
        // fft_size = 512 => max lag 256 => ~172 Hz is the lowest pitch.
        let params = EstimatorParams::new(64, 44100).unwrap();
        let estimator = AutocorrPitchEstimator::new(params).unwrap();
        check!(estimator.max_lag == 256);
        check!(estimator.min_lag == 44);
    }
}
