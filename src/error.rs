//! Error taxonomy for capture, conversion and relocation.
//!
//! Channel-scoped device failures are distinguished from fatal ones so the
//! session can downgrade the former to an advisory.

use std::path::PathBuf;
use thiserror::Error;

use crate::audio::Direction;

/// Failures raised while opening or starting a device stream.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device's native layout or sample format cannot be consumed by the
    /// raw capture path.
    #[error("{device} ({direction}) uses an unsupported {channels}-channel format")]
    Format {
        device: String,
        direction: Direction,
        channels: u16,
    },

    /// Any other failure to open or start a stream.
    #[error("failed to start {device}: {reason}")]
    Start { device: String, reason: String },

    /// One or more release steps failed while stopping a recorder.
    #[error("failed to release {device}: {}", .failures.join("; "))]
    Release {
        device: String,
        failures: Vec<String>,
    },
}

impl DeviceError {
    pub fn start(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::Start {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures of a single encoder run (or of locating the encoder at all).
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(
        "The encoder executable could not be found. Conversion to formats other than WAV is unavailable. Searched: {searched}"
    )]
    EncoderUnavailable { searched: String },

    #[error(
        "Encoder did not terminate within the {timeout_secs} second time limit.\nError Output: {stderr}\nStandard Output: {stdout}"
    )]
    Timeout {
        source_path: PathBuf,
        timeout_secs: u64,
        stdout: String,
        stderr: String,
    },

    #[error(
        "Encoder terminated with non-zero exit code {code:?}.\nError Output: {stderr}\nStandard Output: {stdout}"
    )]
    Failed {
        source_path: PathBuf,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("encoder i/o failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn is_encoder_unavailable(&self) -> bool {
        matches!(self, Self::EncoderUnavailable { .. })
    }
}

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("failed to move {from:?} to {to:?}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact path {0:?} has no file name or parent folder")]
    InvalidPath(PathBuf),
}

/// Errors surfaced by the recording session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to prepare {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conversion aborted: {0}")]
    EncoderUnavailable(ConversionError),

    #[error("{} artifact(s) failed to convert: {}", .0.len(), summarize(.0))]
    Conversion(Vec<ConversionError>),

    #[error(transparent)]
    Relocate(#[from] RelocateError),

    #[error("conversion worker stopped unexpectedly: {0}")]
    Worker(String),

    #[error("stopping a recording needs a running Tokio runtime")]
    NoRuntime,
}

fn summarize(errors: &[ConversionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SessionResult<T> = Result<T, SessionError>;
