//! Delivery of confirmed beats to zero or more sinks.
//!
//! The [`EventReporter`] fans every [`BeatEvent`] out to its [`BeatSink`]s.
//! A failing sink is reported once and then disabled; the other sinks and
//! the pipeline keep running.

use crate::beat_stabilizer::BeatEvent;
use crate::config::EngineConfig;
use crate::error::SinkError;

mod console;
mod counter;
mod csv_log;

pub use console::ConsoleSink;
pub use counter::{BeatCounterHandle, BeatCounterSink};
pub use csv_log::{CsvLogSink, LOG_HEADER};

/// Consumer of confirmed beats.
pub trait BeatSink {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Delivers one beat. Must not keep a reference to the event.
    fn report(&mut self, event: &BeatEvent) -> Result<(), SinkError>;
}

#[derive(Debug)]
struct SinkSlot {
    sink: Box<dyn BeatSink + Send>,
    failed: bool,
}

impl core::fmt::Debug for dyn BeatSink + Send {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BeatSink").field("name", &self.name()).finish()
    }
}

/// Fans beat events out to all configured sinks.
#[derive(Debug, Default)]
pub struct EventReporter {
    slots: Vec<SinkSlot>,
}

impl EventReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the reporter with the console sink and, if enabled, the CSV
    /// log. A log that can't be created is a warning, not an error.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut reporter = Self::new().with_sink(ConsoleSink::stdout(config.visual_feedback));
        if config.logging {
            match CsvLogSink::create(&config.log_dir) {
                Ok((sink, path)) => {
                    log::info!("Logging to: {}", path.display());
                    reporter.add_sink(sink);
                }
                Err(e) => log::warn!(
                    "can't create beat log in {}, continuing without it: {e}",
                    config.log_dir.display()
                ),
            }
        }
        reporter
    }

    /// Builder-style variant of [`Self::add_sink`].
    #[must_use]
    pub fn with_sink(mut self, sink: impl BeatSink + Send + 'static) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: impl BeatSink + Send + 'static) {
        self.slots.push(SinkSlot {
            sink: Box::new(sink),
            failed: false,
        });
    }

    /// Delivers the event to every sink that didn't fail so far.
    pub fn report(&mut self, event: &BeatEvent) {
        for slot in self.slots.iter_mut().filter(|slot| !slot.failed) {
            if let Err(e) = slot.sink.report(event) {
                log::error!(
                    "sink '{}' failed and is disabled for the rest of the run: {e}",
                    slot.sink.name()
                );
                slot.failed = true;
            }
        }
    }

    /// Number of sinks that still receive events.
    #[must_use]
    pub fn active_sinks(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.failed).count()
    }

    /// Total number of configured sinks, including failed ones.
    #[must_use]
    pub fn sinks(&self) -> usize {
        self.slots.len()
    }
}
