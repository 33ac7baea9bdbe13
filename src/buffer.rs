//! Durable fallback buffer for samples the primary store rejected
//!
//! The buffer is a single append-only log with one JSON-encoded
//! [`ResourceSample`] per line. Samples land here when the primary store is
//! unreachable and are drained back by [`FallbackBuffer::replay`] once it
//! recovers.
//!
//! ## Locking
//!
//! One mutex guards every access to the log file. An append issued while a
//! replay is running waits for the replay to finish, so the log is never
//! read and written at the same time.
//!
//! ## Replay semantics
//!
//! Replay is all-or-nothing: records are handed to the processor in append
//! order, and the log is truncated only after every record succeeded. A
//! failure on any record leaves the log untouched so the next replay retries
//! the full set. Lines that fail to decode, including invalid UTF-8, are
//! skipped. An append after a torn write starts on a fresh line.

use std::fmt;
use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::ResourceSample;

/// Result type alias for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors raised by the fallback buffer
#[derive(Debug)]
pub enum BufferError {
    /// Underlying file I/O failed (disk full, permissions, ...)
    Io(std::io::Error),

    /// A sample could not be encoded for the log
    Serialization(serde_json::Error),

    /// The replay processor rejected a record; the log was left untouched
    ReplayAborted {
        /// Zero-based position of the failing record
        position: usize,
        total: usize,
        reason: String,
    },
}

impl BufferError {
    /// Whether this error means a sample could not be written to the log
    pub fn is_write_error(&self) -> bool {
        matches!(self, BufferError::Io(_) | BufferError::Serialization(_))
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Io(err) => write!(f, "buffer I/O error: {}", err),
            BufferError::Serialization(err) => {
                write!(f, "failed to encode buffered sample: {}", err)
            }
            BufferError::ReplayAborted {
                position,
                total,
                reason,
            } => write!(
                f,
                "replay aborted at record {} of {}: {}",
                position + 1,
                total,
                reason
            ),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Io(err) => Some(err),
            BufferError::Serialization(err) => Some(err),
            BufferError::ReplayAborted { .. } => None,
        }
    }
}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        BufferError::Io(err)
    }
}

impl From<serde_json::Error> for BufferError {
    fn from(err: serde_json::Error) -> Self {
        BufferError::Serialization(err)
    }
}

/// Append-only log of samples awaiting replay
#[derive(Debug)]
pub struct FallbackBuffer {
    path: PathBuf,

    /// Serializes all file access (append, replay, pending)
    lock: Mutex<()>,
}

impl FallbackBuffer {
    /// Create a buffer backed by the file at `path`.
    ///
    /// The file itself is created lazily by the first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a sample as one line and sync it to disk
    #[instrument(skip_all, fields(computer_id = %sample.computer_id))]
    pub async fn append(&self, sample: &ResourceSample) -> BufferResult<()> {
        let mut line = serde_json::to_vec(sample)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        // A torn previous write must not swallow this record
        let len = file.metadata().await?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                warn!("buffer ends with a partial record, starting a new line");
                file.write_all(b"\n").await?;
            }
        }

        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;

        trace!("appended sample to {}", self.path.display());
        Ok(())
    }

    /// Hand every buffered sample to `processor` in append order.
    ///
    /// Returns the number of records processed. On success the log is
    /// truncated; if the processor fails, the log is left as it was and
    /// [`BufferError::ReplayAborted`] is returned. A missing log is an empty
    /// buffer.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn replay<F, Fut, E>(&self, mut processor: F) -> BufferResult<usize>
    where
        F: FnMut(ResourceSample) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        let _guard = self.lock.lock().await;

        let Some(samples) = self.read_samples().await? else {
            trace!("no buffer file, nothing to replay");
            return Ok(0);
        };

        let total = samples.len();
        debug!("replaying {} buffered samples", total);

        for (position, sample) in samples.into_iter().enumerate() {
            if let Err(e) = processor(sample).await {
                warn!(
                    "replay aborted at record {} of {}: {}",
                    position + 1,
                    total,
                    e
                );
                return Err(BufferError::ReplayAborted {
                    position,
                    total,
                    reason: e.to_string(),
                });
            }
        }

        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await?;

        if total > 0 {
            info!("replayed {} buffered samples, buffer cleared", total);
        }

        Ok(total)
    }

    /// Number of decodable records currently in the log
    pub async fn pending(&self) -> BufferResult<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read_samples().await?.map_or(0, |s| s.len()))
    }

    /// Read and decode the log. Must be called with the lock held.
    async fn read_samples(&self) -> BufferResult<Option<Vec<ResourceSample>>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let samples = content
            .split(|byte| *byte == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.trim_ascii().is_empty())
            .filter_map(|(number, line)| match serde_json::from_slice(line) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    warn!("skipping corrupt buffer line {}: {}", number + 1, e);
                    None
                }
            })
            .collect();

        Ok(Some(samples))
    }
}
