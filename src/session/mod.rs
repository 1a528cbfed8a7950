//! Recording sessions: channel definitions, naming, advisories and the
//! start/stop orchestrator.

pub mod advisory;
pub mod channel;
pub mod naming;
pub mod recording_session;


pub use advisory::{Advisory, AdvisorySink, LogAdvisories};
pub use channel::{format_size, ChannelSpec, OutputArtifact, DEFAULT_PRESET};
pub use naming::{claim_file_name, recording_folder_name, sanitize_file_name};
pub use recording_session::{ConversionTask, RecordingSession};
