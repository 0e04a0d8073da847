//! Run statistics and the final summary.

use crate::analysis::FrameOutcome;
use core::fmt::{self, Display, Formatter};
use core::time::Duration;
use std::time::Instant;

/// Maximum number of recorded processing latencies. Once reached, further
/// latencies are dropped.
pub const LATENCY_CAPACITY: usize = 1000;

/// Counters of one run. Created at start, consumed by [`RunStats::finalize`].
#[derive(Debug, Clone)]
pub struct RunStats {
    started: Instant,
    frames: u64,
    analyzed_frames: u64,
    onsets: u64,
    beats: u64,
    /// `None` if performance statistics are disabled.
    latencies: Option<Vec<Duration>>,
}

impl RunStats {
    /// Creates the stats. With `performance_stats`, the latency buffer is
    /// allocated here, so recording never allocates.
    pub fn new(performance_stats: bool) -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
            analyzed_frames: 0,
            onsets: 0,
            beats: 0,
            latencies: performance_stats.then(|| Vec::with_capacity(LATENCY_CAPACITY)),
        }
    }

    /// Accounts for one frame that left the analyzer.
    pub fn record_frame(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        if let FrameOutcome::Analyzed(_, result) = outcome {
            self.analyzed_frames += 1;
            if result.onset {
                self.onsets += 1;
            }
        }
    }

    pub fn record_beat(&mut self) {
        self.beats += 1;
    }

    /// Records the processing time of one frame, unless disabled or full.
    pub fn record_latency(&mut self, latency: Duration) {
        if let Some(latencies) = self.latencies.as_mut() {
            if latencies.len() < LATENCY_CAPACITY {
                latencies.push(latency);
            }
        }
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub const fn analyzed_frames(&self) -> u64 {
        self.analyzed_frames
    }

    #[must_use]
    pub const fn onsets(&self) -> u64 {
        self.onsets
    }

    #[must_use]
    pub const fn beats(&self) -> u64 {
        self.beats
    }

    /// Number of recorded latencies.
    #[must_use]
    pub fn latency_samples(&self) -> usize {
        self.latencies.as_ref().map_or(0, Vec::len)
    }

    /// Consumes the stats and creates the summary of the run.
    pub fn finalize(self, average_bpm: Option<f32>) -> Summary {
        Summary {
            runtime: self.started.elapsed(),
            frames: self.frames,
            analyzed_frames: self.analyzed_frames,
            onsets: self.onsets,
            beats: self.beats,
            latency: self.latencies.as_deref().and_then(LatencySummary::from_samples),
            average_bpm,
        }
    }
}

/// Aggregated processing latencies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LatencySummary {
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl LatencySummary {
    /// `None` for no samples.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let total = samples.iter().sum::<Duration>();
        Some(Self {
            average: total / samples.len() as u32,
            min,
            max,
        })
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub runtime: Duration,
    pub frames: u64,
    pub analyzed_frames: u64,
    pub onsets: u64,
    pub beats: u64,
    /// `None` if performance statistics were disabled or nothing was
    /// recorded.
    pub latency: Option<LatencySummary>,
    /// `None` if there was no beat.
    pub average_bpm: Option<f32>,
}

impl Summary {
    /// Confirmed beats per second of runtime.
    #[must_use]
    pub fn detection_rate(&self) -> Option<f64> {
        let secs = self.runtime.as_secs_f64();
        (secs > 0.0).then(|| self.beats as f64 / secs)
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final Statistics:")?;
        writeln!(f, "   Total runtime: {} seconds", self.runtime.as_secs())?;
        writeln!(f, "   Total beats detected: {}", self.beats)?;
        writeln!(f, "   Total frames processed: {}", self.frames)?;
        writeln!(
            f,
            "   Frames analyzed: {} (onsets: {})",
            self.analyzed_frames, self.onsets
        )?;
        if let Some(rate) = self.detection_rate() {
            writeln!(f, "   Detection rate: {rate:.2} beats/sec")?;
        }
        if let Some(latency) = &self.latency {
            writeln!(
                f,
                "   Average processing time: {:.3} ms",
                millis(latency.average)
            )?;
            writeln!(f, "   Max processing time: {:.3} ms", millis(latency.max))?;
            writeln!(f, "   Min processing time: {:.3} ms", millis(latency.min))?;
        }
        if let Some(bpm) = self.average_bpm {
            writeln!(f, "   Final average BPM: {bpm:.1}")?;
        }
        Ok(())
    }
}
