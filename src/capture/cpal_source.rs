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

//! Module for live audio capture from an input device via `cpal`.

use super::{
    report_state_change, AudioSource, CaptureSession, EngineHandBack, EngineReturn, StreamFormat,
    StreamState,
};
use crate::engine::BeatEngine;
use crate::error::StartupError;
use crate::lifecycle::StopFlag;
use core::time::Duration;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use thiserror::Error;

/// How long [`CaptureSession::close`] waits for the callback to return the
/// engine.
const HAND_BACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Failures of the `cpal` backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The input devices could not be enumerated.
    #[error("failed to enumerate input devices")]
    Devices(#[from] cpal::DevicesError),
    /// There was a problem detecting the supported input stream configs.
    #[error("failed to query supported input configs")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    /// Failed to build an input stream.
    #[error("failed to build the input stream")]
    BuildStream(#[from] cpal::BuildStreamError),
    /// Failed to start the input stream.
    #[error("failed to start the input stream")]
    PlayStream(#[from] cpal::PlayStreamError),
}

impl From<CaptureError> for StartupError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Devices(source) => Self::SubsystemUnavailable(source.to_string()),
            CaptureError::BuildStream(cpal::BuildStreamError::StreamConfigNotSupported) => {
                Self::UnsupportedFormat("stream config rejected by the device".to_string())
            }
            other => Self::Connect(Box::new(other)),
        }
    }
}

/// Live input via the default `cpal` host.
#[derive(Debug, Default)]
pub struct CpalSource {
    /// Name of the preferred input device. The default device if `None`.
    device_name: Option<String>,
}

impl CpalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the input device with the given name instead of the default.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    fn find_device(&self) -> Result<cpal::Device, StartupError> {
        let host = cpal::default_host();
        log::debug!("Using '{:?}' as input framework", host.id());

        let device = match &self.device_name {
            Some(name) => host
                .input_devices()
                .map_err(CaptureError::from)?
                .find(|dev| dev.name().is_ok_and(|n| &n == name)),
            None => host.default_input_device(),
        };
        device.ok_or(StartupError::NoInputDevice)
    }

    /// Finds a device config that delivers exactly `format` as `f32`.
    fn negotiate(device: &cpal::Device, format: StreamFormat) -> Result<StreamConfig, StartupError> {
        let rate = SampleRate(format.sample_rate);
        let supported = device
            .supported_input_configs()
            .map_err(CaptureError::from)?
            .find(|range| {
                range.channels() == format.channels
                    && range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate() <= rate
                    && range.max_sample_rate() >= rate
            })
            .ok_or_else(|| StartupError::UnsupportedFormat(format.to_string()))?;

        log::trace!("Supported input configuration: {supported:#?}");

        Ok(StreamConfig {
            channels: format.channels,
            sample_rate: rate,
            buffer_size: BufferSize::Default,
        })
    }
}

impl AudioSource for CpalSource {
    type Session = CpalSession;

    fn connect(
        &mut self,
        format: StreamFormat,
        engine: BeatEngine,
        stop: StopFlag,
    ) -> Result<Self::Session, StartupError> {
        report_state_change(&StreamState::Unconnected, &StreamState::Connecting, &stop);

        let device = self.find_device()?;
        log::debug!(
            "Using '{}' as input device",
            device.name().unwrap_or_else(|_| "<unknown>".to_string())
        );
        let config = Self::negotiate(&device, format)?;
        log::debug!("Input configuration: {config:#?}");

        let (mut guard, engine_return) = EngineHandBack::new(engine);
        let error_stop = stop.clone();

        // Under the hood, this spawns a thread.
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info| {
                    guard.process_block(data);
                },
                move |e| {
                    report_state_change(
                        &StreamState::Streaming,
                        &StreamState::Error(e.to_string()),
                        &error_stop,
                    );
                },
                // Worst case max blocking time. Not too short, as otherwise,
                // the error callback will be invoked frequently.
                Some(Duration::from_secs(1)),
            )
            .map_err(CaptureError::from)?;

        stream.play().map_err(CaptureError::from)?;
        report_state_change(&StreamState::Connecting, &StreamState::Streaming, &stop);

        Ok(CpalSession {
            stream,
            engine_return,
            stop,
        })
    }
}

/// A running `cpal` input stream.
pub struct CpalSession {
    stream: cpal::Stream,
    engine_return: EngineReturn,
    stop: StopFlag,
}

impl CaptureSession for CpalSession {
    fn close(self) -> Option<BeatEngine> {
        let Self {
            stream,
            engine_return,
            stop,
        } = self;
        if let Err(e) = stream.pause() {
            log::debug!("Failed to pause the input stream: {e}");
        }
        // Destroys the callback and with it the hand-back guard.
        drop(stream);
        report_state_change(&StreamState::Streaming, &StreamState::Unconnected, &stop);
        engine_return.wait(HAND_BACK_TIMEOUT)
    }
}
