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
//! Module for [`FrameAccumulator`].

use core::time::Duration;

/// One fixed-size, non-overlapping chunk of mono audio, the unit of
/// analysis. Borrowed from the [`FrameAccumulator`] for the duration of one
/// pipeline pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnalysisFrame<'a> {
    /// Number of this frame since the beginning of the stream, starting at 0.
    /// Frames skipped by the silence gate keep their number.
    pub index: u64,
    /// The samples in range `[-1.0..=1.0]`, in capture order.
    pub samples: &'a [f32],
}

impl AnalysisFrame<'_> {
    /// Number of the first sample of this frame since the beginning of the
    /// stream.
    #[must_use]
    pub fn first_sample(&self) -> u64 {
        self.index * self.samples.len() as u64
    }
}

/// Re-chunks audio blocks of arbitrary length into fixed-size analysis
/// frames.
///
/// The audio subsystem hands out blocks whose length has nothing to do with
/// the frame length of the analysis, e.g., 441, 1024, or sometimes 17
/// samples. Samples are copied into an internal buffer of exactly one frame;
/// every time it is full, the frame is handed to the caller and the fill
/// cursor starts at zero again. No sample is dropped or duplicated across
/// block boundaries and the steady-state path never allocates.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: Box<[f32]>,
    /// Fill cursor into `buffer`.
    filled: usize,
    frames_emitted: u64,
    total_consumed_items: u64,
    time_per_sample: f32,
}

impl FrameAccumulator {
    /// Creates a new accumulator. The only allocation happens here.
    ///
    /// # Panics
    /// Panics if `frame_len` is zero or the sampling frequency is not a
    /// positive normal number.
    pub fn new(frame_len: usize, sampling_frequency: f32) -> Self {
        assert!(frame_len > 0);
        assert!(sampling_frequency.is_normal() && sampling_frequency.is_sign_positive());
        Self {
            buffer: vec![0.0; frame_len].into_boxed_slice(),
            filled: 0,
            frames_emitted: 0,
            total_consumed_items: 0,
            time_per_sample: 1.0 / sampling_frequency,
        }
    }

    /// Consumes one block of mono samples. For every frame that becomes
    /// complete, `on_frame` is invoked with that frame, in order. Left-over
    /// samples stay buffered until the next call.
    pub fn feed(&mut self, mut block: &[f32], mut on_frame: impl FnMut(AnalysisFrame<'_>)) {
        self.total_consumed_items += block.len() as u64;

        while !block.is_empty() {
            let free = self.buffer.len() - self.filled;
            let take = free.min(block.len());
            let (now, later) = block.split_at(take);
            self.buffer[self.filled..self.filled + take].copy_from_slice(now);
            self.filled += take;
            block = later;

            if self.filled == self.buffer.len() {
                let frame = AnalysisFrame {
                    index: self.frames_emitted,
                    samples: &self.buffer,
                };
                self.frames_emitted += 1;
                self.filled = 0;
                on_frame(frame);
            }
        }
    }

    /// Length of one frame in samples.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.buffer.len()
    }

    /// Samples currently waiting for the frame to become complete.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.filled
    }

    /// Number of complete frames handed out so far.
    #[must_use]
    pub const fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Get the passed stream time of all consumed samples.
    pub fn passed_time(&self) -> Duration {
        let seconds = self.time_per_sample * self.total_consumed_items as f32;
        Duration::from_secs_f32(seconds)
    }

    /// Stream time of the first sample of the given frame.
    pub fn timestamp_of_frame(&self, index: u64) -> Duration {
        let seconds = (index * self.buffer.len() as u64) as f32 * self.time_per_sample;
        Duration::from_secs_f32(seconds)
    }
}
