//! Post-recording transcoding through an external encoder process.

pub mod format;
pub mod status;
pub mod supervisor;

pub use format::OutputFormat;
pub use status::{ConversionStatus, ConversionStatusHandle, TrackedFile, EXPECTED_COMPRESSION_RATIO};
pub use supervisor::{
    destination_path, locate_encoder, tail_chars, ConversionSupervisor, EncoderSettings,
    DEFAULT_TIMEOUT, DIAGNOSTIC_TAIL_CHARS,
};
