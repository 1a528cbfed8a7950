//! Conversion progress shared between the background worker and observers.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Factor by which the encoded output is expected to be smaller than raw WAV.
pub const EXPECTED_COMPRESSION_RATIO: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl TrackedFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Reads the current size from disk; missing files count as empty.
    pub fn from_disk(path: &Path) -> Self {
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self::new(path, size_bytes)
    }
}

/// Point-in-time view of a conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionStatus {
    pub pending: Vec<TrackedFile>,
    pub completed: Vec<TrackedFile>,
    pub failed: Vec<TrackedFile>,
    pub compression_ratio: f64,
}

impl Default for ConversionStatus {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            compression_ratio: EXPECTED_COMPRESSION_RATIO,
        }
    }
}

impl ConversionStatus {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// completed / (completed + pending / ratio), clamped to [0, 1].
    pub fn progress(&self) -> f64 {
        let completed: f64 = self.completed.iter().map(|f| f.size_bytes as f64).sum();
        let expected: f64 = self
            .pending
            .iter()
            .map(|f| f.size_bytes as f64 / self.compression_ratio)
            .sum();
        let target = completed + expected;

        if target <= 0.0 {
            return if self.is_complete() { 1.0 } else { 0.0 };
        }
        (completed / target).clamp(0.0, 1.0)
    }
}

/// Thread-safe handle; every read returns a whole snapshot taken under the lock.
#[derive(Clone, Default)]
pub struct ConversionStatusHandle {
    inner: Arc<Mutex<ConversionStatus>>,
}

impl ConversionStatusHandle {
    /// A fresh run with the given files pending. Each run owns its own handle.
    pub fn with_pending(pending: Vec<TrackedFile>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConversionStatus {
                pending,
                ..ConversionStatus::default()
            })),
        }
    }

    pub async fn snapshot(&self) -> ConversionStatus {
        self.inner.lock().await.clone()
    }

    /// Replaces the pending entry for `source` with its encoded output.
    pub async fn complete(&self, source: &Path, converted: TrackedFile) {
        let mut status = self.inner.lock().await;
        status.pending.retain(|f| f.path != source);
        status.completed.push(converted);
    }

    /// Drops `source` from the pending set without counting it as converted.
    pub async fn skip(&self, source: &Path) {
        let mut status = self.inner.lock().await;
        status.pending.retain(|f| f.path != source);
    }

    pub async fn fail(&self, source: &Path) {
        let mut status = self.inner.lock().await;
        if let Some(pos) = status.pending.iter().position(|f| f.path == source) {
            let file = status.pending.remove(pos);
            status.failed.push(file);
        }
    }

    /// Marks every remaining pending file as failed (run aborted).
    pub async fn abort(&self) {
        let mut status = self.inner.lock().await;
        let remaining = std::mem::take(&mut status.pending);
        status.failed.extend(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_status_is_complete() {
        let status = ConversionStatus::default();
        assert!(status.is_complete());
        assert_eq!(status.progress(), 1.0);
        assert_eq!(status.compression_ratio, 15.0);
    }

    #[test]
    fn test_progress_uses_compression_ratio() {
        let status = ConversionStatus {
            pending: vec![TrackedFile::new("/tmp/b.wav", 1500)],
            completed: vec![TrackedFile::new("/tmp/a.mp3", 100)],
            ..ConversionStatus::default()
        };
        // 100 / (100 + 1500 / 15)
        assert!((status.progress() - 0.5).abs() < 1e-9);
        assert!(!status.is_complete());
    }

    #[test]
    fn test_progress_with_empty_pending_files() {
        let status = ConversionStatus {
            pending: vec![TrackedFile::new("/tmp/empty.wav", 0)],
            ..ConversionStatus::default()
        };
        assert_eq!(status.progress(), 0.0);
    }

    #[test]
    fn test_progress_stays_in_range() {
        for (pending, completed) in [(0u64, 1u64), (1, 0), (10_000, 1), (1, 10_000)] {
            let status = ConversionStatus {
                pending: vec![TrackedFile::new("/tmp/p.wav", pending)],
                completed: vec![TrackedFile::new("/tmp/c.mp3", completed)],
                ..ConversionStatus::default()
            };
            let p = status.progress();
            assert!((0.0..=1.0).contains(&p), "progress {p} out of range");
        }
    }

    #[tokio::test]
    async fn test_handle_lifecycle() {
        let handle = ConversionStatusHandle::with_pending(vec![
            TrackedFile::new("/tmp/a.wav", 3000),
            TrackedFile::new("/tmp/b.wav", 3000),
            TrackedFile::new("/tmp/c.wav", 3000),
        ]);
        assert!(!handle.snapshot().await.is_complete());

        handle
            .complete(Path::new("/tmp/a.wav"), TrackedFile::new("/tmp/a.mp3", 200))
            .await;
        handle.skip(Path::new("/tmp/b.wav")).await;
        handle.fail(Path::new("/tmp/c.wav")).await;

        let status = handle.snapshot().await;
        assert!(status.is_complete());
        assert_eq!(status.completed.len(), 1);
        assert_eq!(status.failed.len(), 1);
        assert_eq!(status.failed[0].path, PathBuf::from("/tmp/c.wav"));
    }

    #[tokio::test]
    async fn test_abort_moves_pending_to_failed() {
        let handle = ConversionStatusHandle::with_pending(vec![
            TrackedFile::new("/tmp/a.wav", 1),
            TrackedFile::new("/tmp/b.wav", 1),
        ]);
        handle.abort().await;
        let status = handle.snapshot().await;
        assert!(status.is_complete());
        assert_eq!(status.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reads_see_whole_snapshots() {
        let files: Vec<_> = (0..50)
            .map(|i| TrackedFile::new(format!("/tmp/{i}.wav"), 1500))
            .collect();
        let handle = ConversionStatusHandle::with_pending(files.clone());

        let writer = {
            let handle = handle.clone();
            tokio::spawn(async move {
                for file in files {
                    let out = TrackedFile::new(file.path.with_extension("mp3"), 100);
                    handle.complete(&file.path, out).await;
                }
            })
        };

        for _ in 0..50 {
            let status = handle.snapshot().await;
            assert_eq!(status.pending.len() + status.completed.len(), 50);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        assert!(handle.snapshot().await.is_complete());
    }

    #[tokio::test]
    async fn test_handles_for_separate_runs_are_independent() {
        let first = ConversionStatusHandle::with_pending(vec![TrackedFile::new("/tmp/a.wav", 10)]);
        let second = ConversionStatusHandle::with_pending(vec![TrackedFile::new("/tmp/b.wav", 10)]);

        first
            .complete(Path::new("/tmp/a.wav"), TrackedFile::new("/tmp/a.mp3", 1))
            .await;

        assert!(first.snapshot().await.is_complete());
        let status = second.snapshot().await;
        assert_eq!(status.pending, vec![TrackedFile::new("/tmp/b.wav", 10)]);
        assert!(status.completed.is_empty());
    }
}
