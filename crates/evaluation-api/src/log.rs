//! Append-only JSON-lines log with a single writer
//!
//! Every entry is one line. An append is serialized, written, flushed and
//! synced under the log's mutex; the in-memory copy only grows once the
//! durable write has succeeded, so a failed write leaves both views equal.

use grader_common::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Decision taken by an append closure while holding the writer lock
pub enum Append<T, R> {
    /// Write `T` to the log, then return `R`
    Entry(T, R),
    /// Leave the log untouched and return `R`
    Nothing(R),
}

/// Durable append-only log of `T`
pub struct AppendLog<T> {
    path: PathBuf,
    inner: Mutex<LogInner<T>>,
}

struct LogInner<T> {
    file: File,
    /// Length of the file covered by complete entries
    durable_len: u64,
    entries: Vec<T>,
    /// Set when a failed write could not be rolled back; no further appends
    poisoned: bool,
}

impl<T> AppendLog<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Open (or create) the log at `path`, replaying existing entries
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let (entries, valid_len, needs_newline) = replay::<T>(&path, &content)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if (valid_len as usize) < content.len() {
            warn!(
                "Truncating torn tail of {} ({} -> {} bytes)",
                path.display(),
                content.len(),
                valid_len
            );
            file.set_len(valid_len).await?;
        }

        let mut durable_len = valid_len;
        if needs_newline {
            file.write_all(b"\n").await?;
            file.sync_data().await?;
            durable_len += 1;
        }

        info!("Loaded {} entries from {}", entries.len(), path.display());

        Ok(Self {
            path,
            inner: Mutex::new(LogInner {
                file,
                durable_len,
                entries,
                poisoned: false,
            }),
        })
    }

    /// Append under the writer lock
    ///
    /// `build` sees every entry already in the log and decides whether to
    /// write a new one. Its error aborts the append without touching the file.
    pub async fn append_with<R, F>(&self, build: F) -> Result<R>
    where
        F: FnOnce(&[T]) -> Result<Append<T, R>>,
    {
        let mut inner = self.inner.lock().await;

        if inner.poisoned {
            return Err(Error::Persistence(std::io::Error::other(format!(
                "{} has an unrecoverable partial write",
                self.path.display()
            ))));
        }

        let (entry, ret) = match build(&inner.entries)? {
            Append::Entry(entry, ret) => (entry, ret),
            Append::Nothing(ret) => return Ok(ret),
        };

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        if let Err(e) = write_durably(&mut inner.file, &line).await {
            // Drop any partial line so the next append starts clean.
            let durable_len = inner.durable_len;
            if let Err(trunc) = inner.file.set_len(durable_len).await {
                error!("Failed to roll back {}: {}", self.path.display(), trunc);
                inner.poisoned = true;
            }
            return Err(Error::Persistence(e));
        }

        inner.durable_len += line.len() as u64;
        inner.entries.push(entry);
        debug!("Appended entry {} to {}", inner.entries.len() - 1, self.path.display());

        Ok(ret)
    }

    /// Copy of every entry currently in the log
    pub async fn snapshot(&self) -> Vec<T> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn write_durably(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Parse every complete line; a broken final line is treated as a torn write.
///
/// A torn line may end inside a multi-byte character, so lines are parsed as
/// bytes. Returns the entries, the byte length they cover, and whether the
/// last valid line is missing its terminating newline.
fn replay<T: DeserializeOwned>(path: &Path, content: &[u8]) -> Result<(Vec<T>, u64, bool)> {
    let mut entries = Vec::new();
    let mut valid_len = 0usize;
    let mut needs_newline = false;

    let chunks: Vec<&[u8]> = content.split_inclusive(|b| *b == b'\n').collect();
    let last = chunks.len().saturating_sub(1);

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.iter().all(u8::is_ascii_whitespace) {
            valid_len += chunk.len();
            continue;
        }

        match serde_json::from_slice::<T>(chunk) {
            Ok(entry) => {
                entries.push(entry);
                valid_len += chunk.len();
                needs_newline = chunk.last() != Some(&b'\n');
            }
            Err(e) if index == last => {
                warn!(
                    "Skipping torn final entry in {}: {}",
                    path.display(),
                    e
                );
                needs_newline = false;
            }
            Err(e) => {
                return Err(Error::Validation(format!(
                    "corrupt entry at line {} of {}: {}",
                    index + 1,
                    path.display(),
                    e
                )));
            }
        }
    }

    Ok((entries, valid_len as u64, needs_newline))
}
