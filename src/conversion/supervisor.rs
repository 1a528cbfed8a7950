//! Runs the external encoder for one finished recording at a time.
//!
//! Invocation: `<encoder> -y -i <source> -c:a <codec> <dest>`. Output streams
//! are drained while the process runs and only their tails are kept.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::format::OutputFormat;
use crate::error::ConversionError;

/// Hard wall-clock limit for one encoder run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Characters of stdout/stderr kept for diagnostics.
pub const DIAGNOSTIC_TAIL_CHARS: usize = 500;

const TAIL_BYTES: usize = DIAGNOSTIC_TAIL_CHARS * 4;
const DRAIN_GRACE: Duration = Duration::from_secs(5);
const ENCODER_NAME: &str = "ffmpeg";

/// Where to look for the encoder binary.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Explicit binary; when set no other location is tried.
    pub path: Option<PathBuf>,
    /// Fall back to a `PATH` lookup when nothing sits next to the executable.
    pub search_path: bool,
    pub timeout: Duration,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            path: None,
            search_path: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Finds the encoder: explicit path, then next to the running executable,
/// then (optionally) on `PATH`.
pub fn locate_encoder(settings: &EncoderSettings) -> Result<PathBuf, ConversionError> {
    let mut searched = Vec::new();

    if let Some(path) = &settings.path {
        if path.is_file() {
            return Ok(path.clone());
        }
        return Err(ConversionError::EncoderUnavailable {
            searched: path.display().to_string(),
        });
    }

    let binary = format!("{}{}", ENCODER_NAME, std::env::consts::EXE_SUFFIX);
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let colocated = dir.join(&binary);
        if colocated.is_file() {
            return Ok(colocated);
        }
        searched.push(colocated.display().to_string());
    }

    if settings.search_path {
        match which::which(ENCODER_NAME) {
            Ok(found) => return Ok(found),
            Err(_) => searched.push("PATH".to_string()),
        }
    }

    Err(ConversionError::EncoderUnavailable {
        searched: searched.join(", "),
    })
}

/// `source` with its extension replaced by the one for `format`.
pub fn destination_path(source: &Path, format: OutputFormat) -> PathBuf {
    source.with_extension(format.extension())
}

/// Last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

#[derive(Debug, Clone)]
pub struct ConversionSupervisor {
    encoder: PathBuf,
    timeout: Duration,
}

impl ConversionSupervisor {
    pub fn new(encoder: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            encoder: encoder.into(),
            timeout,
        }
    }

    pub fn locate(settings: &EncoderSettings) -> Result<Self, ConversionError> {
        let encoder = locate_encoder(settings)?;
        info!("Using encoder {:?}", encoder);
        Ok(Self::new(encoder, settings.timeout))
    }

    /// Encodes `source` into `format` next to it and deletes `source` on
    /// success. On any failure the source is left untouched. Raw targets are
    /// returned as-is without running the encoder.
    pub async fn convert(
        &self,
        source: &Path,
        format: OutputFormat,
    ) -> Result<PathBuf, ConversionError> {
        if format.is_raw() {
            return Ok(source.to_path_buf());
        }

        let dest = destination_path(source, format);
        info!("Converting {:?} to {} ({:?})", source, format, dest);

        let mut command = Command::new(&self.encoder);
        command
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-c:a")
            .arg(format.codec())
            .arg(&dest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(|e| ConversionError::Io {
            path: self.encoder.clone(),
            source: e,
        })?;

        let stdout_tail = Arc::new(Mutex::new(Vec::new()));
        let stderr_tail = Arc::new(Mutex::new(Vec::new()));
        let readers = [
            child.stdout.take().map(|out| drain(out, stdout_tail.clone())),
            child.stderr.take().map(|err| drain(err, stderr_tail.clone())),
        ];

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;

        let status = match waited {
            Err(_) => {
                warn!(
                    "Encoder exceeded {}s for {:?}, killing it",
                    self.timeout.as_secs(),
                    source
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill encoder: {}", e);
                }
                join_readers(readers).await;
                return Err(ConversionError::Timeout {
                    source_path: source.to_path_buf(),
                    timeout_secs: self.timeout.as_secs(),
                    stdout: render_tail(&stdout_tail),
                    stderr: render_tail(&stderr_tail),
                });
            }
            Ok(Err(e)) => {
                join_readers(readers).await;
                return Err(ConversionError::Io {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
            Ok(Ok(status)) => status,
        };

        join_readers(readers).await;

        if !status.success() {
            return Err(ConversionError::Failed {
                source_path: source.to_path_buf(),
                code: status.code(),
                stdout: render_tail(&stdout_tail),
                stderr: render_tail(&stderr_tail),
            });
        }

        tokio::fs::remove_file(source)
            .await
            .map_err(|e| ConversionError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;

        debug!("Encoder finished, removed {:?}", source);
        Ok(dest)
    }
}

/// Reads a child stream to EOF keeping only the last `TAIL_BYTES` bytes.
fn drain<R>(mut stream: R, tail: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut tail) = tail.lock() {
                        tail.extend_from_slice(&buf[..n]);
                        if tail.len() > TAIL_BYTES {
                            let excess = tail.len() - TAIL_BYTES;
                            tail.drain(..excess);
                        }
                    }
                }
            }
        }
    })
}

async fn join_readers(readers: [Option<JoinHandle<()>>; 2]) {
    for reader in readers.into_iter().flatten() {
        // a grandchild holding the pipe open must not stall us forever
        if tokio::time::timeout(DRAIN_GRACE, reader).await.is_err() {
            debug!("Encoder output reader did not finish in time");
        }
    }
}

fn render_tail(tail: &Mutex<Vec<u8>>) -> String {
    let bytes = match tail.lock() {
        Ok(bytes) => bytes.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    tail_chars(&String::from_utf8_lossy(&bytes), DIAGNOSTIC_TAIL_CHARS)
}
