//! Uncompressed WAV sink fed directly from capture callbacks.

use anyhow::{Context, Result};
use hound::WavWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use super::device::{SampleBuffer, StreamFormat};

type Writer = WavWriter<BufWriter<File>>;

/// Appends every delivered buffer to a WAV file in the device's native format.
///
/// The writer sits behind a mutex only because the capture callback and
/// `finalize` run on different threads; appends never contend with each other.
#[derive(Clone)]
pub struct WavSink {
    path: PathBuf,
    writer: Arc<Mutex<Option<Writer>>>,
}

impl WavSink {
    pub fn create(path: &Path, format: &StreamFormat) -> Result<Self> {
        let writer = WavWriter::create(path, format.wav_spec())
            .with_context(|| format!("Failed to create WAV file {:?}", path))?;
        debug!(
            "Opened WAV sink {:?} ({}Hz, {}ch, {:?})",
            path, format.sample_rate, format.channels, format.sample_kind
        );
        Ok(Self {
            path: path.to_path_buf(),
            writer: Arc::new(Mutex::new(Some(writer))),
        })
    }

    /// Writes one buffer. Buffers arriving after `finalize` are dropped.
    pub fn append(&self, buffer: SampleBuffer<'_>) -> Result<()> {
        let mut guard = match self.writer.lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(()),
        };
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        match buffer {
            SampleBuffer::I16(data) => data
                .iter()
                .try_for_each(|&s| writer.write_sample(s))
                .context("Failed to write i16 samples")?,
            SampleBuffer::I32(data) => data
                .iter()
                .try_for_each(|&s| writer.write_sample(s))
                .context("Failed to write i32 samples")?,
            SampleBuffer::F32(data) => data
                .iter()
                .try_for_each(|&s| writer.write_sample(s))
                .context("Failed to write f32 samples")?,
        }
        Ok(())
    }

    /// Handler suitable for a capture stream. Write failures are logged once
    /// and later buffers skipped rather than stalling the callback thread.
    pub fn handler(&self) -> super::device::BufferHandler {
        let sink = self.clone();
        let mut failed = false;
        Box::new(move |buffer: SampleBuffer<'_>| {
            if failed {
                return;
            }
            if let Err(e) = sink.append(buffer) {
                error!("Dropping audio for {:?}: {:#}", sink.path, e);
                failed = true;
            }
        })
    }

    /// Flushes the header and data to disk and closes the file. Idempotent.
    pub fn finalize(&self) -> Result<()> {
        let writer = match self.writer.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(writer) = writer {
            writer
                .finalize()
                .with_context(|| format!("Failed to finalize WAV file {:?}", self.path))?;
            debug!("Finalized WAV sink {:?}", self.path);
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}
