//! Audio capture: endpoint discovery, the backend seam, WAV sinks and the
//! per-channel stream recorder.

pub mod cpal_backend;
pub mod device;
pub mod sink;
pub mod stream_recorder;

#[cfg(test)]
pub(crate) mod fake;

pub use cpal_backend::CpalBackend;
pub use device::{
    ActiveStream, AudioBackend, BufferHandler, DeviceDirectory, DeviceSelector, DeviceState,
    Direction, Endpoint, EndpointInfo, ResolvedDevice, SampleBuffer, SampleKind, StreamFormat,
};
pub use sink::WavSink;
pub use stream_recorder::StreamRecorder;
