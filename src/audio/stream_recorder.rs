//! One channel's capture stream, WAV sink and (for loopback) silent playback,
//! owned and released as a unit.

use std::path::Path;
use tracing::{debug, info, warn};

use super::device::{ActiveStream, AudioBackend, Direction, ResolvedDevice, StreamFormat};
use super::sink::WavSink;
use crate::error::DeviceError;

pub struct StreamRecorder {
    device_name: String,
    format: StreamFormat,
    capture: Option<Box<dyn ActiveStream>>,
    sink: Option<WavSink>,
    silence: Option<Box<dyn ActiveStream>>,
}

impl StreamRecorder {
    /// Opens the device in its native format and starts writing to `target`.
    ///
    /// Render devices first get a silent playback stream so the engine keeps
    /// producing loopback data while nothing else is playing. If any step
    /// fails, everything opened so far is released and the partial file removed.
    pub fn start<B: AudioBackend>(
        backend: &B,
        device: &ResolvedDevice<B::Device>,
        target: &Path,
    ) -> Result<Self, DeviceError> {
        let format = backend.native_format(device)?;
        let sink = WavSink::create(target, &format)
            .map_err(|e| DeviceError::start(&device.name, format!("{e:#}")))?;

        let mut recorder = Self {
            device_name: device.name.clone(),
            format,
            capture: None,
            sink: Some(sink.clone()),
            silence: None,
        };

        if let Err(e) = recorder.open_streams(backend, device, &sink) {
            if let Err(release) = recorder.stop() {
                warn!("Cleanup after failed start of {}: {}", device.name, release);
            }
            if let Err(rm) = std::fs::remove_file(target) {
                debug!("Could not remove partial file {:?}: {}", target, rm);
            }
            return Err(e);
        }

        info!(
            "Recording {} ({}, {}ch @ {}Hz) to {:?}",
            recorder.device_name,
            device.direction,
            format.channels,
            format.sample_rate,
            target
        );
        Ok(recorder)
    }

    fn open_streams<B: AudioBackend>(
        &mut self,
        backend: &B,
        device: &ResolvedDevice<B::Device>,
        sink: &WavSink,
    ) -> Result<(), DeviceError> {
        if device.direction == Direction::Render {
            let mut silence = backend.open_silence(device)?;
            silence.play()?;
            self.silence = Some(silence);
            debug!("Silent playback running on {}", device.name);
        }

        let mut capture = backend.open_capture(device, &self.format, sink.handler())?;
        let started = capture.play();
        self.capture = Some(capture);
        started
    }

    /// Releases capture, sink and silent playback in that order. Every step
    /// is attempted even if an earlier one fails. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        let mut failures = Vec::new();

        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.stop() {
                failures.push(format!("capture: {e}"));
            }
        }

        if let Some(sink) = self.sink.take() {
            if let Err(e) = sink.finalize() {
                failures.push(format!("sink: {e:#}"));
            }
        }

        if let Some(mut silence) = self.silence.take() {
            if let Err(e) = silence.stop() {
                failures.push(format!("silent playback: {e}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeviceError::Release {
                device: self.device_name.clone(),
                failures,
            })
        }
    }

    pub fn is_active(&self) -> bool {
        self.capture.is_some() || self.sink.is_some() || self.silence.is_some()
    }

    pub fn has_silent_playback(&self) -> bool {
        self.silence.is_some()
    }
}

impl Drop for StreamRecorder {
    fn drop(&mut self) {
        if self.is_active() {
            debug!("Dropping active StreamRecorder for {}, cleaning up", self.device_name);
            if let Err(e) = self.stop() {
                warn!("{}", e);
            }
        }
    }
}
