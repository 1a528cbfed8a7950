//! Recording run orchestrator.
//!
//! Lifecycle: start (resolve + start one recorder per channel) → stop (release
//! every recorder) → background worker (convert → relocate → prune), one
//! artifact at a time.

use chrono::Local;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::advisory::{Advisory, AdvisorySink, LogAdvisories};
use super::channel::{ChannelSpec, OutputArtifact};
use super::naming::{claim_file_name, recording_folder_name, sanitize_file_name};
use crate::audio::{AudioBackend, DeviceDirectory, Direction, StreamRecorder};
use crate::conversion::{ConversionStatusHandle, ConversionSupervisor, EncoderSettings, TrackedFile};
use crate::error::{ConversionError, DeviceError, RelocateError, SessionError, SessionResult};
use crate::storage::{create_unique_dir, paths_equal, prune_if_empty, relocate};

const RAW_EXTENSION: &str = "wav";

struct ActiveChannel {
    channel: Arc<ChannelSpec>,
    recorder: StreamRecorder,
}

/// Where a run's raw files live while it records.
#[derive(Debug, Clone)]
struct WorkingFolder {
    root: PathBuf,
    dir: PathBuf,
}

pub struct RecordingSession<B: AudioBackend> {
    backend: B,
    encoder: EncoderSettings,
    advisories: Box<dyn AdvisorySink>,
    status: ConversionStatusHandle,
    active: Vec<ActiveChannel>,
    artifacts: Vec<OutputArtifact>,
    working: Option<WorkingFolder>,
    started_at: Option<Instant>,
}

impl<B: AudioBackend> RecordingSession<B> {
    pub fn new(backend: B, encoder: EncoderSettings) -> Self {
        Self {
            backend,
            encoder,
            advisories: Box::new(LogAdvisories),
            status: ConversionStatusHandle::default(),
            active: Vec::new(),
            artifacts: Vec::new(),
            working: None,
            started_at: None,
        }
    }

    pub fn with_advisories(mut self, sink: Box<dyn AdvisorySink>) -> Self {
        self.advisories = sink;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.working.is_some()
    }

    /// Progress of the current run: the files being recorded while recording,
    /// then the conversion started by the last stop. Every run gets its own
    /// handle, so handles taken from earlier runs keep tracking those runs.
    pub fn conversion_status(&self) -> ConversionStatusHandle {
        self.status.clone()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// Current artifacts with freshly read sizes.
    pub fn artifacts(&mut self) -> Vec<OutputArtifact> {
        for artifact in &mut self.artifacts {
            artifact.refresh_size();
        }
        self.artifacts.clone()
    }

    pub fn recorders(&self) -> impl Iterator<Item = (&ChannelSpec, &StreamRecorder)> {
        self.active.iter().map(|a| (a.channel.as_ref(), &a.recorder))
    }

    /// Starts one recorder per enabled channel whose device resolves.
    ///
    /// Unresolved channels are skipped silently; render devices with an
    /// unsupported multichannel layout are skipped with an advisory. Any other
    /// start failure stops the recorders already started by this call, removes
    /// their files and is returned. An empty result is valid and means nothing
    /// is being recorded.
    pub async fn start_session(
        &mut self,
        channels: &[ChannelSpec],
        working_folder: &Path,
    ) -> SessionResult<Vec<OutputArtifact>> {
        if self.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }

        let folder_name = recording_folder_name(Local::now());
        let dir = create_unique_dir(working_folder, &folder_name).map_err(|source| {
            SessionError::Io {
                path: working_folder.join(&folder_name),
                source,
            }
        })?;

        let endpoints = DeviceDirectory::new(&self.backend).active_endpoints();
        debug!("{} active endpoint(s) available", endpoints.len());

        let mut claimed = HashSet::new();
        for channel in channels.iter().filter(|c| c.enabled) {
            let resolved = DeviceDirectory::<B>::resolve_in(endpoints.iter().cloned(), &channel.device);
            let Some(device) = resolved else {
                info!(
                    "Skipping channel '{}': device {} is not available",
                    channel.name,
                    channel.device.describe()
                );
                continue;
            };

            let file_name = claim_file_name(&dir, &channel.name, RAW_EXTENSION, &mut claimed);
            let preferred = format!("{}.{}", sanitize_file_name(&channel.name), RAW_EXTENSION);
            if !file_name.eq_ignore_ascii_case(&preferred) {
                warn!(
                    "Channel '{}' collides with another channel's file name, recording to {}",
                    channel.name, file_name
                );
            }
            let path = dir.join(&file_name);

            match StreamRecorder::start(&self.backend, &device, &path) {
                Ok(recorder) => {
                    let channel = Arc::new(channel.clone());
                    self.artifacts
                        .push(OutputArtifact::new(channel.clone(), path.clone()));
                    self.active.push(ActiveChannel { channel, recorder });
                    debug!("Starting to record {:?}", path);
                }
                Err(DeviceError::Format {
                    device: device_name,
                    direction: Direction::Render,
                    channels: layout,
                }) if layout > 2 => {
                    self.advisories.advise(&Advisory::UnsupportedFormat {
                        channel: channel.name.clone(),
                        device: device_name,
                        channels: layout,
                    });
                }
                Err(e) => {
                    error!("Failed to start channel '{}': {}", channel.name, e);
                    self.abort_partial_start(&dir);
                    return Err(e.into());
                }
            }
        }

        if self.artifacts.is_empty() {
            self.advisories.advise(&Advisory::NothingToRecord);
            prune_if_empty(&dir);
            return Ok(Vec::new());
        }

        self.status = ConversionStatusHandle::with_pending(
            self.artifacts.iter().map(OutputArtifact::tracked).collect(),
        );
        self.working = Some(WorkingFolder {
            root: working_folder.to_path_buf(),
            dir,
        });
        self.started_at = Some(Instant::now());

        info!("Recording session started with {} channel(s)", self.artifacts.len());
        Ok(self.artifacts.clone())
    }

    fn abort_partial_start(&mut self, dir: &Path) {
        for mut active in self.active.drain(..) {
            if let Err(e) = active.recorder.stop() {
                warn!("{}", e);
            }
        }
        for artifact in self.artifacts.drain(..) {
            if let Err(e) = std::fs::remove_file(&artifact.path) {
                debug!("Could not remove {:?}: {}", artifact.path, e);
            }
        }
        prune_if_empty(dir);
    }

    /// Stops every recorder now, then converts and relocates the recorded
    /// files on a background task.
    ///
    /// Outside a Tokio runtime this returns [`SessionError::NoRuntime`] and
    /// leaves the session recording.
    pub fn stop_session(&mut self, final_folder: &Path) -> SessionResult<ConversionTask> {
        if !self.is_recording() {
            return Err(SessionError::NotRecording);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let working = self.working.take().ok_or(SessionError::NotRecording)?;

        for mut active in self.active.drain(..) {
            if let Err(e) = active.recorder.stop() {
                warn!("Error while stopping channel '{}': {}", active.channel.name, e);
            }
        }
        self.started_at = None;

        let mut artifacts = std::mem::take(&mut self.artifacts);
        for artifact in &mut artifacts {
            artifact.refresh_size();
        }
        info!("Recording stopped, {} artifact(s) to finish", artifacts.len());

        self.status = ConversionStatusHandle::with_pending(
            artifacts.iter().map(OutputArtifact::tracked).collect(),
        );
        let worker = Worker {
            artifacts,
            working,
            final_root: final_folder.to_path_buf(),
            encoder: self.encoder.clone(),
            status: self.status.clone(),
        };

        Ok(ConversionTask {
            handle: runtime.spawn(worker.run()),
            status: self.status.clone(),
        })
    }
}

/// Handle to the background conversion of a stopped session.
pub struct ConversionTask {
    handle: JoinHandle<SessionResult<Vec<OutputArtifact>>>,
    status: ConversionStatusHandle,
}

impl ConversionTask {
    pub fn status(&self) -> ConversionStatusHandle {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns the artifacts at their final paths.
    pub async fn wait(self) -> SessionResult<Vec<OutputArtifact>> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::Worker(e.to_string())),
        }
    }
}

struct Worker {
    artifacts: Vec<OutputArtifact>,
    working: WorkingFolder,
    final_root: PathBuf,
    encoder: EncoderSettings,
    status: ConversionStatusHandle,
}

impl Worker {
    async fn run(mut self) -> SessionResult<Vec<OutputArtifact>> {
        let supervisor = if self.artifacts.iter().any(OutputArtifact::needs_conversion) {
            match ConversionSupervisor::locate(&self.encoder) {
                Ok(supervisor) => Some(supervisor),
                Err(e) => {
                    error!("{}", e);
                    self.status.abort().await;
                    return Err(SessionError::EncoderUnavailable(e));
                }
            }
        } else {
            None
        };

        let final_dir = if paths_equal(&self.working.root, &self.final_root) {
            self.working.dir.clone()
        } else {
            let folder_name = recording_folder_name(Local::now());
            match create_unique_dir(&self.final_root, &folder_name) {
                Ok(dir) => dir,
                Err(source) => {
                    self.status.abort().await;
                    return Err(SessionError::Io {
                        path: self.final_root.join(folder_name),
                        source,
                    });
                }
            }
        };

        let mut conversion_failures: Vec<ConversionError> = Vec::new();
        let mut relocation_failures: Vec<RelocateError> = Vec::new();

        for artifact in &mut self.artifacts {
            let original = artifact.path.clone();

            if let Some(supervisor) = supervisor.as_ref().filter(|_| artifact.needs_conversion()) {
                debug!("Converting {:?} to {}", original, artifact.target_format());
                match supervisor.convert(&original, artifact.target_format()).await {
                    Ok(converted) => artifact.path = converted,
                    Err(e) => {
                        error!("Conversion of {:?} failed: {}", original, e);
                        self.status.fail(&original).await;
                        conversion_failures.push(e);
                        continue;
                    }
                }
            }

            match relocate(&artifact.path, &final_dir) {
                Ok(moved) => artifact.path = moved,
                Err(e) => {
                    error!("{}", e);
                    self.status.fail(&original).await;
                    relocation_failures.push(e);
                    continue;
                }
            }
            artifact.refresh_size();

            if artifact.needs_conversion() {
                self.status
                    .complete(&original, TrackedFile::from_disk(&artifact.path))
                    .await;
            } else {
                self.status.skip(&original).await;
            }
        }

        prune_if_empty(&self.working.dir);
        prune_if_empty(&final_dir);

        if !conversion_failures.is_empty() {
            return Err(SessionError::Conversion(conversion_failures));
        }
        if let Some(first) = relocation_failures.into_iter().next() {
            return Err(SessionError::Relocate(first));
        }

        info!("Recording saved to {:?}", final_dir);
        Ok(self.artifacts)
    }
}
