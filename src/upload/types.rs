use std::path::{Path, PathBuf};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use uuid::Uuid;
use crate::errors::{Result, UploadError};
use crate::media::{ResourceKind, UploadedMedia};
use super::progress_aggregator::BatchProgress;

/// Read size for streamed bodies; one progress tick per chunk
pub const BODY_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TaskState {
    /// Created, request not yet launched
    Pending,
    /// Request launched
    InProgress,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::InProgress)
                | (TaskState::InProgress, TaskState::Succeeded)
                | (TaskState::InProgress, TaskState::Failed)
        )
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Memory(Bytes),
    Disk(PathBuf),
}

/// A user-selected file: declared name, declared size and the payload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub size: u64,
    payload: Payload,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            payload: Payload::Memory(data),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UploadError::Validation(format!("Can't read file name of {}", path.display())))?
            .to_string();
        let size = tokio::fs::metadata(path).await?.len();

        Ok(Self {
            name,
            size,
            payload: Payload::Disk(path.to_path_buf()),
        })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Image or video by extension; anything else is not uploaded
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_file_name(&self.name)
    }

    /// Body chunks in order, ready to be wrapped by a progress stream
    pub async fn body_stream(&self) -> Result<BoxStream<'static, std::io::Result<Bytes>>> {
        match &self.payload {
            Payload::Memory(data) => {
                let data = data.clone();
                let chunks: Vec<std::io::Result<Bytes>> = (0..data.len())
                    .step_by(BODY_CHUNK_SIZE)
                    .map(|start| Ok(data.slice(start..(start + BODY_CHUNK_SIZE).min(data.len()))))
                    .collect();

                Ok(stream::iter(chunks).boxed())
            }
            Payload::Disk(path) => {
                let file = File::open(path).await?;
                Ok(ReaderStream::with_capacity(file, BODY_CHUNK_SIZE).boxed())
            }
        }
    }
}

/// One file's journey through a batch
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: UploadId,
    pub index: usize,
    pub file_name: String,
    pub state: TaskState,
    pub bytes_sent: u64,
    pub bytes_total: u64,
    pub error: Option<String>,
}

impl UploadTask {
    pub fn new(index: usize, file: &UploadFile) -> Self {
        Self {
            id: UploadId::new(),
            index,
            file_name: file.name.clone(),
            state: TaskState::Pending,
            bytes_sent: 0,
            bytes_total: file.size,
            error: None,
        }
    }

    /// Move to `next`, returning the previous state
    pub fn transition(&mut self, next: TaskState) -> Result<TaskState> {
        if !self.state.can_transition_to(next) {
            return Err(UploadError::internal_error(format!(
                "Illegal transition {:?} -> {:?} for {}",
                self.state, next, self.file_name
            )));
        }

        let old_state = self.state;
        self.state = next;
        Ok(old_state)
    }

    pub fn record_bytes(&mut self, bytes_sent: u64, bytes_total: u64) {
        if bytes_total > 0 {
            self.bytes_total = bytes_total;
        }

        self.bytes_sent = if self.bytes_total > 0 {
            bytes_sent.min(self.bytes_total)
        } else {
            bytes_sent
        };
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    StateChanged {
        upload_id: UploadId,
        index: usize,
        old_state: TaskState,
        new_state: TaskState,
    },

    Progress(BatchProgress),

    BatchCompleted {
        uploaded: usize,
    },

    BatchFailed {
        error: String,
    },
}

/// Outcome of a settled batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub uploaded: Vec<UploadedMedia>,
    pub message: Option<String>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}
