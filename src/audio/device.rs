//! Endpoint discovery and the backend seam.
//!
//! The directory never caches: every session start enumerates the endpoints
//! that are active right now and resolves channel selectors against them.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::DeviceError;

/// Data-flow direction of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Microphone-style input.
    Capture,
    /// Output device; recorded through loopback.
    Render,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Capture => "capture",
            Direction::Render => "render",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Active,
    Disabled,
    Unplugged,
    Unknown,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Active => "active",
            DeviceState::Disabled => "disabled",
            DeviceState::Unplugged => "unplugged",
            DeviceState::Unknown => "unknown",
        }
    }
}

/// Descriptive part of an endpoint, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub state: DeviceState,
}

/// An enumerated endpoint together with the backend's live handle.
#[derive(Debug, Clone)]
pub struct Endpoint<D> {
    pub info: EndpointInfo,
    pub handle: D,
}

/// An endpoint matched to a channel at session start.
#[derive(Debug, Clone)]
pub struct ResolvedDevice<D> {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub handle: D,
}

impl<D> From<Endpoint<D>> for ResolvedDevice<D> {
    fn from(endpoint: Endpoint<D>) -> Self {
        Self {
            id: endpoint.info.id,
            name: endpoint.info.name,
            direction: endpoint.info.direction,
            handle: endpoint.handle,
        }
    }
}

/// How a channel names its device: stable id first, display name as fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelector {
    #[serde(default, rename = "device_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "device_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DeviceSelector {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether `info` satisfies this selector. The name is only consulted
    /// when the selector carries no id.
    pub fn matches(&self, info: &EndpointInfo) -> bool {
        match self.id() {
            Some(id) => info.id == id,
            None => self.name.as_deref() == Some(info.name.as_str()),
        }
    }

    /// Label used in logs and advisories.
    pub fn describe(&self) -> &str {
        self.id()
            .or(self.name.as_deref())
            .unwrap_or("<unassigned>")
    }
}

/// Sample encodings the raw capture path writes without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    I16,
    I32,
    F32,
}

/// Native format of a capture stream; the WAV sink mirrors it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_kind: SampleKind,
}

impl StreamFormat {
    pub fn wav_spec(&self) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self.sample_kind {
            SampleKind::I16 => (16, hound::SampleFormat::Int),
            SampleKind::I32 => (32, hound::SampleFormat::Int),
            SampleKind::F32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// One buffer as delivered by a capture callback.
#[derive(Debug, Clone, Copy)]
pub enum SampleBuffer<'a> {
    I16(&'a [i16]),
    I32(&'a [i32]),
    F32(&'a [f32]),
}

impl SampleBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::I16(data) => data.len(),
            SampleBuffer::I32(data) => data.len(),
            SampleBuffer::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Called once per delivered buffer, in delivery order, on the device's
/// callback thread.
pub type BufferHandler = Box<dyn FnMut(SampleBuffer<'_>) + Send + 'static>;

/// A started (or startable) device stream.
pub trait ActiveStream {
    fn play(&mut self) -> Result<(), DeviceError>;

    /// Stops the stream and releases the device. Must tolerate repeated calls.
    fn stop(&mut self) -> Result<(), DeviceError>;
}

/// Platform audio seam. The production implementation is cpal; tests use an
/// in-memory fake.
pub trait AudioBackend {
    type Device: Clone;

    /// Every endpoint the host knows about, in both directions.
    fn endpoints(&self) -> anyhow::Result<Vec<Endpoint<Self::Device>>>;

    fn native_format(
        &self,
        device: &ResolvedDevice<Self::Device>,
    ) -> Result<StreamFormat, DeviceError>;

    /// Opens (without starting) a capture stream. Render devices are opened
    /// in loopback mode.
    fn open_capture(
        &self,
        device: &ResolvedDevice<Self::Device>,
        format: &StreamFormat,
        on_data: BufferHandler,
    ) -> Result<Box<dyn ActiveStream>, DeviceError>;

    /// Opens (without starting) a constant-zero output stream on a render device.
    fn open_silence(
        &self,
        device: &ResolvedDevice<Self::Device>,
    ) -> Result<Box<dyn ActiveStream>, DeviceError>;
}

/// Resolves channel selectors to live endpoints.
pub struct DeviceDirectory<'a, B: AudioBackend> {
    backend: &'a B,
}

impl<'a, B: AudioBackend> DeviceDirectory<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Active endpoints at call time. Enumeration failures yield an empty list.
    pub fn active_endpoints(&self) -> Vec<Endpoint<B::Device>> {
        match self.backend.endpoints() {
            Ok(endpoints) => endpoints
                .into_iter()
                .filter(|e| e.info.state == DeviceState::Active)
                .collect(),
            Err(e) => {
                warn!("Failed to enumerate audio endpoints: {:#}", e);
                Vec::new()
            }
        }
    }

    /// All endpoints regardless of state, for listing.
    pub fn list(&self) -> anyhow::Result<Vec<EndpointInfo>> {
        Ok(self
            .backend
            .endpoints()?
            .into_iter()
            .map(|e| e.info)
            .collect())
    }

    /// Absence is not an error: an unmatched selector means the channel is skipped.
    pub fn resolve(&self, selector: &DeviceSelector) -> Option<ResolvedDevice<B::Device>> {
        Self::resolve_in(self.active_endpoints(), selector)
    }

    /// Resolves against an already enumerated set, so a session start
    /// enumerates once for all its channels.
    pub fn resolve_in(
        endpoints: impl IntoIterator<Item = Endpoint<B::Device>>,
        selector: &DeviceSelector,
    ) -> Option<ResolvedDevice<B::Device>> {
        let found = endpoints
            .into_iter()
            .find(|e| selector.matches(&e.info))
            .map(ResolvedDevice::from);
        if found.is_none() {
            debug!("No active endpoint matches {}", selector.describe());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::FakeBackend;

    fn info(id: &str, name: &str, direction: Direction) -> EndpointInfo {
        EndpointInfo {
            id: id.to_string(),
            name: name.to_string(),
            direction,
            state: DeviceState::Active,
        }
    }

    #[test]
    fn test_selector_prefers_id() {
        let selector = DeviceSelector {
            id: Some("dev-1".to_string()),
            name: Some("Speakers".to_string()),
        };
        assert!(selector.matches(&info("dev-1", "Microphone", Direction::Capture)));
        // id present: the name is never consulted
        assert!(!selector.matches(&info("dev-2", "Speakers", Direction::Render)));
    }

    #[test]
    fn test_selector_name_fallback_is_direction_agnostic() {
        let selector = DeviceSelector::by_name("Speakers");
        assert!(selector.matches(&info("x", "Speakers", Direction::Render)));
        assert!(selector.matches(&info("y", "Speakers", Direction::Capture)));
        assert!(!selector.matches(&info("z", "Headset", Direction::Capture)));
    }

    #[test]
    fn test_empty_id_falls_back_to_name() {
        let selector = DeviceSelector {
            id: Some(String::new()),
            name: Some("Headset".to_string()),
        };
        assert!(selector.matches(&info("any", "Headset", Direction::Capture)));
    }

    #[test]
    fn test_resolve_skips_inactive_endpoints() {
        let backend = FakeBackend::new();
        backend.add_endpoint("mic", "Microphone", Direction::Capture);
        backend.add_endpoint_with_state("old", "Old Mic", Direction::Capture, DeviceState::Unplugged);

        let directory = DeviceDirectory::new(&backend);
        assert!(directory.resolve(&DeviceSelector::by_id("mic")).is_some());
        assert!(directory.resolve(&DeviceSelector::by_id("old")).is_none());
        assert_eq!(directory.list().unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_with_no_devices() {
        let backend = FakeBackend::new();
        let directory = DeviceDirectory::new(&backend);
        assert!(directory.active_endpoints().is_empty());
        assert!(directory.resolve(&DeviceSelector::by_name("Speakers")).is_none());
    }

    #[test]
    fn test_enumeration_failure_is_empty() {
        let backend = FakeBackend::new();
        backend.add_endpoint("mic", "Microphone", Direction::Capture);
        backend.fail_enumeration();
        let directory = DeviceDirectory::new(&backend);
        assert!(directory.resolve(&DeviceSelector::by_id("mic")).is_none());
    }

    #[test]
    fn test_wav_spec_mirrors_native_format() {
        let format = StreamFormat {
            sample_rate: 48_000,
            channels: 2,
            sample_kind: SampleKind::F32,
        };
        let spec = format.wav_spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    }
}
