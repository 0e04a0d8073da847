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

//! Real-time beat detection on a live audio stream.
//!
//! The audio callback drives one [`BeatEngine`] per stream, synchronously:
//!
//! ```text
//! audio block -> FrameAccumulator -> Analyzer (silence gate, estimators)
//!             -> BeatStabilizer -> EventReporter (console, CSV log, counters)
//! ```
//!
//! The [`lifecycle::Controller`] connects the stream via an
//! [`capture::AudioSource`] (live input with the `recording` feature), waits
//! for a stop request, and produces the final [`stats::Summary`].
//!
//! # Example
//! ```rust
//! use live_beat_detector::{BeatEngine, EngineConfig, EventReporter, StopFlag};
//!
//! let config = EngineConfig {
//!     logging: false,
//!     ..EngineConfig::default()
//! };
//! let mut engine = BeatEngine::with_reporter(&config, EventReporter::new(), StopFlag::new()).unwrap();
//! // Feed audio blocks of any length from your audio callback.
//! engine.process_block(&[0.0; 441]);
//! println!("{}", engine.finish());
//! ```

pub mod analysis;
pub mod beat_stabilizer;
pub mod capture;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame_accumulator;
pub mod lifecycle;
pub mod reporter;
pub mod signal_gate;
pub mod stats;
pub mod util;

#[cfg(test)]
mod test_utils;

pub use beat_stabilizer::{BeatEvent, BeatStabilizer};
pub use config::EngineConfig;
pub use engine::{BeatEngine, BlockStatus};
pub use error::{RunError, StartupError, UsageError};
pub use frame_accumulator::{AnalysisFrame, FrameAccumulator};
pub use lifecycle::{Controller, LifecycleState, StopFlag};
pub use reporter::{BeatSink, EventReporter};
