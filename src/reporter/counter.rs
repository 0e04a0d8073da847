use super::BeatSink;
use crate::beat_stabilizer::BeatEvent;
use crate::error::SinkError;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    beats: AtomicU64,
    /// Bits of the `f32` BPM of the last beat.
    last_bpm: AtomicU32,
    stable: AtomicU64,
}

/// In-memory beat counters. Cheap and lock-free; the values can be polled
/// from any thread through a [`BeatCounterHandle`].
#[derive(Debug, Default)]
pub struct BeatCounterSink {
    counters: Arc<Counters>,
}

impl BeatCounterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that observes the counters of this sink.
    pub fn handle(&self) -> BeatCounterHandle {
        BeatCounterHandle {
            counters: self.counters.clone(),
        }
    }
}

impl BeatSink for BeatCounterSink {
    fn name(&self) -> &str {
        "counter"
    }

    fn report(&mut self, event: &BeatEvent) -> Result<(), SinkError> {
        self.counters
            .last_bpm
            .store(event.bpm.to_bits(), Ordering::Relaxed);
        if event.stable {
            self.counters.stable.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.beats.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

/// Read side of a [`BeatCounterSink`].
#[derive(Debug, Clone)]
pub struct BeatCounterHandle {
    counters: Arc<Counters>,
}

impl BeatCounterHandle {
    pub fn beats(&self) -> u64 {
        self.counters.beats.load(Ordering::Acquire)
    }

    /// Number of beats that were classified as stable.
    pub fn stable_beats(&self) -> u64 {
        self.counters.stable.load(Ordering::Acquire)
    }

    /// BPM of the last beat. `None` before the first one.
    pub fn last_bpm(&self) -> Option<f32> {
        (self.beats() > 0).then(|| f32::from_bits(self.counters.last_bpm.load(Ordering::Relaxed)))
    }
}
