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
//! Module for [`BeatEngine`].

use crate::analysis::{Analyzer, EstimatorParams, FrameOutcome, DIAGNOSTIC_PERIOD};
use crate::beat_stabilizer::BeatStabilizer;
use crate::config::EngineConfig;
use crate::error::StartupError;
use crate::frame_accumulator::FrameAccumulator;
use crate::lifecycle::StopFlag;
use crate::reporter::EventReporter;
use crate::stats::{RunStats, Summary};
use core::time::Duration;
use std::time::Instant;

/// What [`BeatEngine::process_block`] did with a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockStatus {
    /// The samples went into the pipeline.
    Processed,
    /// The block was empty or contained non-finite samples and was dropped.
    Skipped,
    /// Stop was requested; the block was ignored.
    Stopped,
}

/// The per-block pipeline: frame accumulation, analysis, stabilization, and
/// reporting. Driven synchronously by the audio callback.
///
/// The field order is the drop order: the estimators are released before
/// the sinks (and therefore the log file).
#[derive(Debug)]
pub struct BeatEngine {
    accumulator: FrameAccumulator,
    analyzer: Analyzer,
    stabilizer: BeatStabilizer,
    stats: RunStats,
    reporter: EventReporter,
    stop: StopFlag,
    sample_rate: f64,
    measure_latency: bool,
}

impl BeatEngine {
    /// Creates the engine from its parts.
    pub fn new(
        config: &EngineConfig,
        analyzer: Analyzer,
        reporter: EventReporter,
        stop: StopFlag,
    ) -> Self {
        Self {
            accumulator: FrameAccumulator::new(config.frame_len, config.sample_rate as f32),
            analyzer,
            stabilizer: BeatStabilizer::new(),
            stats: RunStats::new(config.performance_stats),
            reporter,
            stop,
            sample_rate: config.sample_rate as f64,
            measure_latency: config.performance_stats,
        }
    }

    /// Creates the engine with the default estimators and the given sinks.
    pub fn with_reporter(
        config: &EngineConfig,
        reporter: EventReporter,
        stop: StopFlag,
    ) -> Result<Self, StartupError> {
        let params = EstimatorParams::from_config(config)?;
        let analyzer = Analyzer::new(params, config.pitch_detection)?;
        Ok(Self::new(config, analyzer, reporter, stop))
    }

    /// Consumes one audio block. Never blocks and, apart from the sinks,
    /// never allocates.
    pub fn process_block(&mut self, block: &[f32]) -> BlockStatus {
        if self.stop.is_requested() {
            return BlockStatus::Stopped;
        }
        if block.is_empty() || block.iter().any(|sample| !sample.is_finite()) {
            log::trace!("skipping invalid block of {} samples", block.len());
            return BlockStatus::Skipped;
        }

        let Self {
            accumulator,
            analyzer,
            stabilizer,
            stats,
            reporter,
            sample_rate,
            measure_latency,
            ..
        } = self;

        accumulator.feed(block, |frame| {
            let begin = measure_latency.then(Instant::now);

            let outcome = analyzer.analyze(&frame);
            stats.record_frame(&outcome);

            if let FrameOutcome::Analyzed(metrics, result) = outcome {
                let timestamp = Duration::from_secs_f64(frame.first_sample() as f64 / *sample_rate);
                let beat = stabilizer.update(&result, &metrics, timestamp);

                let number = frame.index + 1;
                if number % DIAGNOSTIC_PERIOD == 0 {
                    log::debug!(
                        "[DEBUG] Frame #{} | Amp: {:.4} | BPM: {:.1} | Conf: {:.2} | Beat: {}",
                        number,
                        metrics.peak,
                        stabilizer.smoothed_bpm(),
                        result.confidence,
                        if beat.is_some() { "YES" } else { "NO" }
                    );
                }

                if let Some(beat) = beat {
                    stats.record_beat();
                    reporter.report(&beat);
                }
            }

            if let Some(begin) = begin {
                stats.record_latency(begin.elapsed());
            }
        });

        BlockStatus::Processed
    }

    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    #[must_use]
    pub const fn stabilizer(&self) -> &BeatStabilizer {
        &self.stabilizer
    }

    #[must_use]
    pub const fn reporter(&self) -> &EventReporter {
        &self.reporter
    }

    #[must_use]
    pub const fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Stream time of all samples consumed so far.
    #[must_use]
    pub fn stream_time(&self) -> Duration {
        self.accumulator.passed_time()
    }

    /// Finalizes the run statistics.
    pub fn finish(self) -> Summary {
        let average_bpm = self.stabilizer.average_bpm();
        self.stats.finalize(average_bpm)
    }
}
