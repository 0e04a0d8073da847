//! Benchmarks the per-block pipeline, i.e., the work done inside the audio
//! callback.
//!
//! To run these, run `$ cargo bench --bench engine_bench`

use criterion::{criterion_group, criterion_main, Criterion};
use live_beat_detector::{BeatEngine, EngineConfig, EventReporter, StopFlag};
use std::hint::black_box;

/// Typical block length of an audio server at 44.1 kHz (10 ms).
const BLOCK_LEN: usize = 441;

fn criterion_benchmark(c: &mut Criterion) {
    let samples = signals::click_train(120.0, 10.0, 44100);

    for (frame_len, pitch) in [(128, false), (128, true), (1024, false), (1024, true)] {
        let config = EngineConfig {
            frame_len,
            logging: false,
            performance_stats: false,
            pitch_detection: pitch,
            ..EngineConfig::default()
        };
        let mut engine =
            BeatEngine::with_reporter(&config, EventReporter::new(), StopFlag::new()).unwrap();
        let mut blocks = samples.chunks_exact(BLOCK_LEN).cycle();

        c.bench_function(
            &format!("process block of {BLOCK_LEN} samples (frame {frame_len}, pitch: {pitch})"),
            |b| {
                b.iter(|| {
                    let block = blocks.next().unwrap();
                    black_box(engine.process_block(black_box(block)));
                })
            },
        );
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

mod signals {
    /// A quiet 1 kHz hum with a decaying click every `60 / bpm` seconds.
    pub fn click_train(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f32) as usize;
        let period = (60.0 / bpm * sample_rate as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let hum = 0.05 * (core::f32::consts::TAU * 1000.0 * t).sin();
                let n = i % period;
                let click = if n < 128 {
                    let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                    sign * 0.8 * (-(n as f32) / 16.0).exp()
                } else {
                    0.0
                };
                hum + click
            })
            .collect()
    }
}
