//! Validated runtime configuration of the engine.

use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Sample rate requested from the audio subsystem.
pub const SAMPLE_RATE_HZ: u32 = 44100;
/// Channel count requested from the audio subsystem.
pub const CHANNELS: u16 = 1;
/// Default analysis frame length in samples.
pub const DEFAULT_FRAME_LEN: usize = 128;
/// Valid analysis frame lengths in samples.
pub const FRAME_LEN_RANGE: RangeInclusive<usize> = 64..=8192;
/// The FFT size of the estimators is the frame length times this factor.
pub const FFT_SIZE_FACTOR: usize = 8;

/// Configuration of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of one analysis frame in samples.
    pub frame_len: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// Append every beat to a CSV log file.
    pub logging: bool,
    /// Record per-block processing latencies for the final summary.
    pub performance_stats: bool,
    pub pitch_detection: bool,
    /// Console bar visualization instead of one plain line per beat.
    pub visual_feedback: bool,
    /// Directory for the CSV log file.
    pub log_dir: PathBuf,
    /// Name of the input device. The default input device if `None`.
    pub input_device: Option<String>,
}

impl EngineConfig {
    /// FFT size handed to the estimators.
    #[must_use]
    pub const fn fft_size(&self) -> usize {
        self.frame_len * FFT_SIZE_FACTOR
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_len: DEFAULT_FRAME_LEN,
            sample_rate: SAMPLE_RATE_HZ,
            channels: CHANNELS,
            logging: true,
            performance_stats: true,
            pitch_detection: false,
            visual_feedback: true,
            log_dir: PathBuf::from("."),
            input_device: None,
        }
    }
}
