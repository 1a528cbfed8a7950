//! cpal implementation of the audio backend.
//!
//! Render endpoints are captured in loopback mode by building an input stream
//! on the output device, which cpal supports on WASAPI. PipeWire/PulseAudio
//! monitor sources show up as ordinary capture endpoints instead.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, Sample, SizedSample};
use tracing::{debug, error};

use super::device::{
    ActiveStream, AudioBackend, BufferHandler, DeviceState, Direction, Endpoint, EndpointInfo,
    ResolvedDevice, SampleBuffer, SampleKind, StreamFormat,
};
use crate::error::DeviceError;

pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// cpal exposes no persistent endpoint id, so the direction-qualified
    /// name serves as one.
    pub fn endpoint_id(direction: Direction, name: &str) -> String {
        format!("{}:{}", direction.as_str(), name)
    }

    fn collect(
        devices: impl Iterator<Item = cpal::Device>,
        direction: Direction,
        out: &mut Vec<Endpoint<cpal::Device>>,
    ) {
        for device in devices {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    debug!("Skipping {} device without a name: {}", direction, e);
                    continue;
                }
            };
            out.push(Endpoint {
                info: EndpointInfo {
                    id: Self::endpoint_id(direction, &name),
                    name,
                    direction,
                    state: DeviceState::Active,
                },
                handle: device,
            });
        }
    }

    fn supported_config(
        device: &ResolvedDevice<cpal::Device>,
    ) -> Result<cpal::SupportedStreamConfig, DeviceError> {
        let config = match device.direction {
            Direction::Capture => device.handle.default_input_config(),
            Direction::Render => device.handle.default_output_config(),
        };
        config.map_err(|e| DeviceError::start(&device.name, e))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Device = cpal::Device;

    fn endpoints(&self) -> Result<Vec<Endpoint<cpal::Device>>> {
        let mut endpoints = Vec::new();
        let inputs = self
            .host
            .input_devices()
            .context("Failed to enumerate capture devices")?;
        Self::collect(inputs, Direction::Capture, &mut endpoints);
        let outputs = self
            .host
            .output_devices()
            .context("Failed to enumerate render devices")?;
        Self::collect(outputs, Direction::Render, &mut endpoints);
        Ok(endpoints)
    }

    fn native_format(
        &self,
        device: &ResolvedDevice<cpal::Device>,
    ) -> Result<StreamFormat, DeviceError> {
        let config = Self::supported_config(device)?;
        let Some(sample_kind) = wav_sample_kind(config.sample_format()) else {
            debug!(
                "{} delivers {:?} samples, which cannot be written as-is",
                device.name,
                config.sample_format()
            );
            return Err(DeviceError::Format {
                device: device.name.clone(),
                direction: device.direction,
                channels: config.channels(),
            });
        };
        Ok(StreamFormat {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            sample_kind,
        })
    }

    fn open_capture(
        &self,
        device: &ResolvedDevice<cpal::Device>,
        format: &StreamFormat,
        mut on_data: BufferHandler,
    ) -> Result<Box<dyn ActiveStream>, DeviceError> {
        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let name = device.name.clone();
        let err_fn = move |err| error!("Capture stream error on {}: {}", name, err);

        let built = match format.sample_kind {
            SampleKind::I16 => device.handle.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| on_data(SampleBuffer::I16(data)),
                err_fn,
                None,
            ),
            SampleKind::I32 => device.handle.build_input_stream(
                &config,
                move |data: &[i32], _: &cpal::InputCallbackInfo| on_data(SampleBuffer::I32(data)),
                err_fn,
                None,
            ),
            SampleKind::F32 => device.handle.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| on_data(SampleBuffer::F32(data)),
                err_fn,
                None,
            ),
        };

        let stream = built.map_err(|e| build_error(device, format.channels, e))?;
        Ok(Box::new(CpalStream::new(&device.name, stream)))
    }

    fn open_silence(
        &self,
        device: &ResolvedDevice<cpal::Device>,
    ) -> Result<Box<dyn ActiveStream>, DeviceError> {
        let supported = device
            .handle
            .default_output_config()
            .map_err(|e| DeviceError::start(&device.name, e))?;
        let config = supported.config();

        let built = match supported.sample_format() {
            cpal::SampleFormat::I16 => build_silence::<i16>(&device.handle, &config),
            cpal::SampleFormat::U16 => build_silence::<u16>(&device.handle, &config),
            cpal::SampleFormat::I32 => build_silence::<i32>(&device.handle, &config),
            cpal::SampleFormat::F32 => build_silence::<f32>(&device.handle, &config),
            other => {
                return Err(DeviceError::start(
                    &device.name,
                    format!("unsupported playback sample format {other:?}"),
                ))
            }
        };

        let stream = built.map_err(|e| DeviceError::start(&device.name, e))?;
        Ok(Box::new(CpalStream::new(&device.name, stream)))
    }
}

/// Native sample formats the WAV sink can store unchanged.
fn wav_sample_kind(format: cpal::SampleFormat) -> Option<SampleKind> {
    match format {
        cpal::SampleFormat::I16 => Some(SampleKind::I16),
        cpal::SampleFormat::I32 => Some(SampleKind::I32),
        cpal::SampleFormat::F32 => Some(SampleKind::F32),
        _ => None,
    }
}

fn build_silence<T: SizedSample + Send + 'static>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
) -> Result<cpal::Stream, BuildStreamError> {
    device.build_output_stream(
        config,
        |data: &mut [T], _: &cpal::OutputCallbackInfo| data.fill(T::EQUILIBRIUM),
        |err| error!("Silent playback stream error: {}", err),
        None,
    )
}

fn build_error(
    device: &ResolvedDevice<cpal::Device>,
    channels: u16,
    err: BuildStreamError,
) -> DeviceError {
    match err {
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            DeviceError::Format {
                device: device.name.clone(),
                direction: device.direction,
                channels,
            }
        }
        other => DeviceError::start(&device.name, other),
    }
}

struct CpalStream {
    device: String,
    stream: Option<cpal::Stream>,
}

impl CpalStream {
    fn new(device: &str, stream: cpal::Stream) -> Self {
        Self {
            device: device.to_string(),
            stream: Some(stream),
        }
    }
}

impl ActiveStream for CpalStream {
    fn play(&mut self) -> Result<(), DeviceError> {
        match &self.stream {
            Some(stream) => stream
                .play()
                .map_err(|e| DeviceError::start(&self.device, e)),
            None => Err(DeviceError::start(&self.device, "stream already released")),
        }
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        // Dropping the stream releases the device even when pause fails.
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        drop(stream);
        paused.map_err(|e| DeviceError::start(&self.device, e))
    }
}
