//! File journal queue.
//!
//! The inbound queue is an append-only JSON-lines file. Each line is one
//! command; its byte position is its offset. The committed offset lives in
//! a separate file and is rewritten atomically (write `.tmp`, then rename).
//! Everything past the committed offset is delivered again after a restart.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::application::dto::OrderResult;
use crate::application::ports::{
    Delivery, DeliveryReceipt, EmitError, OrderSourcePort, QueueError, ResultEmitterPort,
};

/// Default wait between polls at the end of the journal.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct ReadState {
    reader: Option<BufReader<File>>,
    read_pos: u64,
}

/// Order source tailing a JSON-lines journal.
#[derive(Debug)]
pub struct JournalOrderSource {
    path: PathBuf,
    offset_path: PathBuf,
    poll_interval: Duration,
    follow: bool,
    state: Mutex<ReadState>,
    committed: Mutex<u64>,
}

impl JournalOrderSource {
    /// Open a journal, resuming from the committed offset in `offset_path`
    /// (start of file when none has been committed yet).
    pub async fn open(
        path: impl Into<PathBuf>,
        offset_path: impl Into<PathBuf>,
    ) -> Result<Self, QueueError> {
        let path = path.into();
        let offset_path = offset_path.into();
        if let Some(parent) = offset_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let committed = read_offset(&offset_path).await?;

        tracing::info!(
            journal = %path.display(),
            queue_offset = committed,
            "Resuming order journal"
        );

        Ok(Self {
            path,
            offset_path,
            poll_interval: DEFAULT_POLL_INTERVAL,
            follow: true,
            state: Mutex::new(ReadState {
                reader: None,
                read_pos: committed,
            }),
            committed: Mutex::new(committed),
        })
    }

    /// Set the wait between polls at the end of the journal.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Stop at the end of the journal instead of waiting for more lines.
    #[must_use]
    pub const fn until_end(mut self) -> Self {
        self.follow = false;
        self
    }

    /// Offset of the last commit.
    pub async fn committed_offset(&self) -> u64 {
        *self.committed.lock().await
    }
}

#[async_trait]
impl OrderSourcePort for JournalOrderSource {
    async fn next(&self) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.state.lock().await;

        loop {
            if state.reader.is_none() {
                match File::open(&self.path).await {
                    Ok(file) => state.reader = Some(BufReader::new(file)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        if !self.follow {
                            return Ok(None);
                        }
                        tokio::time::sleep(self.poll_interval).await;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            let ReadState {
                reader: Some(reader),
                read_pos,
            } = &mut *state
            else {
                continue;
            };

            // The read position only moves after a whole line was read, so a
            // dropped call resumes from the same place.
            reader.seek(SeekFrom::Start(*read_pos)).await?;
            let mut line = Vec::new();
            let read = reader.read_until(b'\n', &mut line).await?;

            let complete = line.last() == Some(&b'\n');
            if read > 0 && (complete || !self.follow) {
                let offset = *read_pos;
                *read_pos += read as u64;

                let payload = trim_line(line);
                if payload.is_empty() {
                    continue;
                }
                return Ok(Some(Delivery {
                    receipt: DeliveryReceipt {
                        offset,
                        next_offset: *read_pos,
                    },
                    payload,
                }));
            }

            if !self.follow {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn commit(&self, receipt: DeliveryReceipt) -> Result<(), QueueError> {
        let mut committed = self.committed.lock().await;
        if receipt.next_offset <= *committed {
            return Ok(());
        }
        write_offset(&self.offset_path, receipt.next_offset).await?;
        *committed = receipt.next_offset;
        tracing::debug!(queue_offset = receipt.next_offset, "Journal offset committed");
        Ok(())
    }
}

fn trim_line(mut line: Vec<u8>) -> Vec<u8> {
    while line.last().is_some_and(u8::is_ascii_whitespace) {
        line.pop();
    }
    if line.iter().all(u8::is_ascii_whitespace) {
        line.clear();
    }
    line
}

async fn read_offset(path: &Path) -> Result<u64, QueueError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text
            .trim()
            .parse()
            .map_err(|e| QueueError::CorruptOffset {
                message: format!("{}: {e}", path.display()),
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn write_offset(path: &Path, offset: u64) -> Result<(), QueueError> {
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, format!("{offset}\n")).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Result emitter appending outbound records to a JSON-lines journal.
#[derive(Debug)]
pub struct JournalResultEmitter {
    path: PathBuf,
    file: Mutex<File>,
}

impl JournalResultEmitter {
    /// Open (or create) the outbound journal in append mode.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Journal location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultEmitterPort for JournalResultEmitter {
    async fn emit(&self, result: &OrderResult) -> Result<(), EmitError> {
        // The outbound record keeps the inbound shape.
        let mut line =
            serde_json::to_vec(&result.record).map_err(|e| EmitError::SerializationError {
                message: e.to_string(),
            })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| EmitError::PublishFailed {
                message: e.to_string(),
            })?;
        file.flush().await.map_err(|e| EmitError::PublishFailed {
            message: e.to_string(),
        })
    }
}
