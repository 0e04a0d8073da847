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

/// Synthetic test signals. All signals are mono.
pub mod signals {
    use std::vec::Vec;

    /// Frequency of the background hum of [`click_train`].
    pub const HUM_FREQUENCY: f32 = 1000.0;
    /// Amplitude of the background hum of [`click_train`]. Above the silence
    /// gate, so every frame gets analyzed.
    pub const HUM_AMPLITUDE: f32 = 0.05;
    /// Length of one click in samples.
    pub const CLICK_LEN: usize = 128;
    const CLICK_AMPLITUDE: f32 = 0.8;
    const CLICK_DECAY_SAMPLES: f32 = 16.0;
    /// Frequency of the body of a drum hit of [`drum_hits`].
    pub const DRUM_BODY_FREQUENCY: f32 = 150.0;
    /// Amplitude of the body of a drum hit when it starts.
    pub const DRUM_BODY_AMPLITUDE: f32 = 0.5;
    /// Time constant of the exponential decay of the body. The body falls
    /// below the silence gate after `ln(0.5 / 0.01) * 60 ms`, i.e., ~235 ms.
    pub const DRUM_DECAY_SECS: f32 = 0.06;

    /// Start sample of every beat at `bpm` within `len` samples. The first
    /// beat starts at sample 0.
    fn beat_starts(bpm: f32, sample_rate: u32, len: usize) -> impl Iterator<Item = usize> {
        let period = 60.0 / bpm as f64 * sample_rate as f64;
        (0_u64..)
            .map(move |beat| (beat as f64 * period).round() as usize)
            .take_while(move |&start| start < len)
    }

    /// Adds a short, broadband click at `start`.
    fn add_click(samples: &mut [f32], start: usize) {
        samples[start..]
            .iter_mut()
            .take(CLICK_LEN)
            .enumerate()
            .for_each(|(n, sample)| {
                let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                *sample += sign * CLICK_AMPLITUDE * (-(n as f32) / CLICK_DECAY_SAMPLES).exp();
            });
    }

    /// Sine tone of `len` samples.
    pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        let step = core::f64::consts::TAU * frequency as f64 / sample_rate as f64;
        (0..len)
            .map(|i| amplitude * ((i as f64 * step).sin() as f32))
            .collect()
    }

    /// A steady hum with a short, broadband click every `60 / bpm` seconds.
    /// The first click starts at sample 0.
    pub fn click_train(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f32) as usize;
        let mut samples = sine(HUM_FREQUENCY, HUM_AMPLITUDE, sample_rate, len);

        for start in beat_starts(bpm, sample_rate, len) {
            add_click(&mut samples, start);
        }
        samples
    }

    /// Drum-like hits every `60 / bpm` seconds over digital silence. A hit
    /// is a click as attack plus a low tone as body that decays
    /// exponentially. The body is cut off after 360 ms, so below ~160 BPM
    /// the signal is exactly zero for a while before the next hit.
    pub fn drum_hits(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f32) as usize;
        let mut samples = vec![0.0; len];
        let step = core::f32::consts::TAU * DRUM_BODY_FREQUENCY / sample_rate as f32;
        // Cut the body off well below the silence gate.
        let body_len = (DRUM_DECAY_SECS * 6.0 * sample_rate as f32) as usize;

        for start in beat_starts(bpm, sample_rate, len) {
            samples[start..]
                .iter_mut()
                .take(body_len)
                .enumerate()
                .for_each(|(n, sample)| {
                    let t = n as f32 / sample_rate as f32;
                    *sample += DRUM_BODY_AMPLITUDE * (-t / DRUM_DECAY_SECS).exp() * (step * n as f32).sin();
                });
            add_click(&mut samples, start);
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::signals;
    use assert2::check;

    #[test]
    fn click_train_layout() {
        let signal = signals::click_train(120.0, 1.0, 44100);
        check!(signal.len() == 44100);
        // Clicks at 0 and 22050.
        check!(signal[0] > 0.75);
        check!(signal[22050] > 0.75);
        check!(signal[11025].abs() <= signals::HUM_AMPLITUDE);
    }

    #[test]
    fn drum_hits_fade_into_silence() {
        let signal = signals::drum_hits(120.0, 1.0, 44100);
        check!(signal.len() == 44100);
        check!(signal[0] > 0.75);
        check!(signal[22050] > 0.75);
        // Still above the silence gate 100 ms after the hit.
        let body = &signal[4410..4410 + 147];
        check!(body.iter().any(|s| s.abs() > 0.05));
        // Digital silence before the next hit.
        check!(signal[22050 - 2000..22050].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sine_amplitude() {
        let tone = signals::sine(441.0, 0.5, 44100, 100);
        check!(tone[0] == 0.0);
        check!((tone[25] - 0.5).abs() < 1e-6);
    }
}
