//! In-memory backend used by recorder and session tests.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::device::{
    ActiveStream, AudioBackend, BufferHandler, DeviceState, Direction, Endpoint, EndpointInfo,
    ResolvedDevice, SampleBuffer, SampleKind, StreamFormat,
};
use crate::error::DeviceError;

#[derive(Default)]
struct FakeState {
    endpoints: Vec<Endpoint<String>>,
    channels: Vec<(String, u16)>,
    fail_enumeration: bool,
    format_errors: HashSet<String>,
    start_errors: HashSet<String>,
    capture_stop_errors: HashSet<String>,
    silence_stop_errors: HashSet<String>,
    captures_started: Vec<String>,
    captures_stopped: Vec<String>,
    silences_started: Vec<String>,
    silences_stopped: Vec<String>,
}

/// Endpoints are keyed by id; the handle is the id itself.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_endpoint(&self, id: &str, name: &str, direction: Direction) {
        self.add_endpoint_with_state(id, name, direction, DeviceState::Active);
    }

    pub fn add_endpoint_with_state(
        &self,
        id: &str,
        name: &str,
        direction: Direction,
        state: DeviceState,
    ) {
        self.state.lock().unwrap().endpoints.push(Endpoint {
            info: EndpointInfo {
                id: id.to_string(),
                name: name.to_string(),
                direction,
                state,
            },
            handle: id.to_string(),
        });
    }

    pub fn set_channels(&self, id: &str, channels: u16) {
        self.state
            .lock()
            .unwrap()
            .channels
            .push((id.to_string(), channels));
    }

    pub fn fail_enumeration(&self) {
        self.state.lock().unwrap().fail_enumeration = true;
    }

    /// Starting capture on `id` fails because of its channel layout.
    pub fn fail_format(&self, id: &str) {
        self.state.lock().unwrap().format_errors.insert(id.to_string());
    }

    pub fn fail_start(&self, id: &str) {
        self.state.lock().unwrap().start_errors.insert(id.to_string());
    }

    pub fn fail_capture_stop(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .capture_stop_errors
            .insert(id.to_string());
    }

    pub fn fail_silence_stop(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .silence_stop_errors
            .insert(id.to_string());
    }

    pub fn captures_started(&self) -> Vec<String> {
        self.state.lock().unwrap().captures_started.clone()
    }

    pub fn captures_stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().captures_stopped.clone()
    }

    pub fn silences_started(&self) -> Vec<String> {
        self.state.lock().unwrap().silences_started.clone()
    }

    pub fn silences_stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().silences_stopped.clone()
    }

    fn channels_for(&self, id: &str) -> u16 {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .rev()
            .find(|(dev, _)| dev == id)
            .map(|(_, ch)| *ch)
            .unwrap_or(2)
    }
}

impl AudioBackend for FakeBackend {
    type Device = String;

    fn endpoints(&self) -> Result<Vec<Endpoint<String>>> {
        let state = self.state.lock().unwrap();
        if state.fail_enumeration {
            return Err(anyhow!("host unavailable"));
        }
        Ok(state.endpoints.clone())
    }

    fn native_format(&self, device: &ResolvedDevice<String>) -> Result<StreamFormat, DeviceError> {
        Ok(StreamFormat {
            sample_rate: 48_000,
            channels: self.channels_for(&device.handle),
            sample_kind: SampleKind::F32,
        })
    }

    fn open_capture(
        &self,
        device: &ResolvedDevice<String>,
        format: &StreamFormat,
        on_data: BufferHandler,
    ) -> Result<Box<dyn ActiveStream>, DeviceError> {
        Ok(Box::new(FakeStream {
            backend: self.clone(),
            id: device.handle.clone(),
            name: device.name.clone(),
            direction: device.direction,
            channels: format.channels,
            kind: StreamKind::Capture(on_data),
            stopped: false,
        }))
    }

    fn open_silence(
        &self,
        device: &ResolvedDevice<String>,
    ) -> Result<Box<dyn ActiveStream>, DeviceError> {
        Ok(Box::new(FakeStream {
            backend: self.clone(),
            id: device.handle.clone(),
            name: device.name.clone(),
            direction: device.direction,
            channels: 2,
            kind: StreamKind::Silence,
            stopped: false,
        }))
    }
}

enum StreamKind {
    Capture(BufferHandler),
    Silence,
}

struct FakeStream {
    backend: FakeBackend,
    id: String,
    name: String,
    direction: Direction,
    channels: u16,
    kind: StreamKind,
    stopped: bool,
}

impl ActiveStream for FakeStream {
    fn play(&mut self) -> Result<(), DeviceError> {
        let mut state = self.backend.state.lock().unwrap();
        match &mut self.kind {
            StreamKind::Capture(handler) => {
                if state.format_errors.contains(&self.id) {
                    return Err(DeviceError::Format {
                        device: self.name.clone(),
                        direction: self.direction,
                        channels: self.channels,
                    });
                }
                if state.start_errors.contains(&self.id) {
                    return Err(DeviceError::start(&self.name, "device busy"));
                }
                state.captures_started.push(self.id.clone());
                drop(state);
                // two frames of audio delivered synchronously
                let frame = vec![0.25f32; self.channels as usize * 2];
                handler(SampleBuffer::F32(&frame));
            }
            StreamKind::Silence => state.silences_started.push(self.id.clone()),
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        let mut state = self.backend.state.lock().unwrap();
        match self.kind {
            StreamKind::Capture(_) => {
                state.captures_stopped.push(self.id.clone());
                if state.capture_stop_errors.contains(&self.id) {
                    return Err(DeviceError::start(&self.name, "capture stop failed"));
                }
            }
            StreamKind::Silence => {
                state.silences_stopped.push(self.id.clone());
                if state.silence_stop_errors.contains(&self.id) {
                    return Err(DeviceError::start(&self.name, "playback stop failed"));
                }
            }
        }
        Ok(())
    }
}
