//! Startup and shutdown of a run.
//!
//! The [`Controller`] walks through the [`LifecycleState`]s, acquires the
//! sinks, the analyzer, and the input stream (in this order), waits for a
//! stop request, and releases everything in reverse order before the
//! [`Summary`] is produced.

use crate::capture::{AudioSource, CaptureSession, StreamFormat};
use crate::config::EngineConfig;
use crate::engine::BeatEngine;
use crate::error::{InvalidTransition, RunError, StartupError};
use crate::reporter::{BeatCounterHandle, BeatCounterSink, EventReporter};
use crate::stats::Summary;
use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default interval in which the controller checks the [`StopFlag`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One-shot, lock-free "stop requested" flag. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the stop. Can be called from any thread, including signal
    /// handlers.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Registers a process interrupt handler (Ctrl+C, SIGTERM) that requests
    /// the stop. Only one handler can be registered per process.
    #[cfg(feature = "recording")]
    pub fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::info!("Received interrupt, stopping gracefully...");
            flag.request();
        })
    }
}

/// States of a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initializing,
    Running,
    Stopping,
    Terminated,
}

impl LifecycleState {
    /// Returns the next state if the transition is allowed.
    pub fn transition(self, to: Self) -> Result<Self, InvalidTransition> {
        use self::LifecycleState::*;
        match (self, to) {
            (Created, Initializing)
            | (Initializing, Running)
            | (Initializing, Terminated)
            | (Running, Stopping)
            | (Stopping, Terminated) => Ok(to),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

/// Runs the engine on an [`AudioSource`] from startup to the final summary.
#[derive(Debug)]
pub struct Controller<S: AudioSource> {
    source: S,
    config: EngineConfig,
    stop: StopFlag,
    state: LifecycleState,
    counter: BeatCounterHandle,
    counter_sink: Option<BeatCounterSink>,
    poll_interval: Duration,
}

impl<S: AudioSource> Controller<S> {
    pub fn new(source: S, config: EngineConfig, stop: StopFlag) -> Self {
        let counter_sink = BeatCounterSink::new();
        Self {
            source,
            config,
            stop,
            state: LifecycleState::Created,
            counter: counter_sink.handle(),
            counter_sink: Some(counter_sink),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Live beat counters of the run, readable from any thread.
    #[must_use]
    pub fn beat_counter(&self) -> BeatCounterHandle {
        self.counter.clone()
    }

    #[must_use]
    pub const fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    fn advance(&mut self, to: LifecycleState) -> Result<(), InvalidTransition> {
        self.state = self.state.transition(to)?;
        log::debug!("Lifecycle: {:?}", self.state);
        Ok(())
    }

    /// Acquires the sinks, the analyzer, and the input stream.
    fn start(&mut self) -> Result<S::Session, StartupError> {
        let mut reporter = EventReporter::from_config(&self.config);
        if let Some(counter) = self.counter_sink.take() {
            reporter.add_sink(counter);
        }
        let engine = BeatEngine::with_reporter(&self.config, reporter, self.stop.clone())?;
        self.source.connect(
            StreamFormat::from_config(&self.config),
            engine,
            self.stop.clone(),
        )
    }

    /// Runs until a stop is requested, then shuts down and returns the
    /// summary. `on_running` is invoked once the stream is live.
    ///
    /// A failing startup terminates the run immediately; whatever was
    /// acquired so far is released.
    pub fn run(&mut self, on_running: impl FnOnce(&EngineConfig)) -> Result<Summary, RunError> {
        self.advance(LifecycleState::Initializing)?;

        let session = match self.start() {
            Ok(session) => session,
            Err(e) => {
                self.advance(LifecycleState::Terminated)?;
                return Err(e.into());
            }
        };

        self.advance(LifecycleState::Running)?;
        on_running(&self.config);

        while !self.stop.is_requested() {
            std::thread::sleep(self.poll_interval);
        }

        self.advance(LifecycleState::Stopping)?;
        let engine = session.close();
        self.advance(LifecycleState::Terminated)?;

        let engine = engine.ok_or(RunError::EngineLost)?;
        Ok(engine.finish())
    }
}
