mod client;
mod manager;
mod status;
pub mod types;
pub mod progress_aggregator;
mod progress_stream;

pub use client::{CloudinaryClient, MediaHost};
pub use manager::{BatchUploader, UploadSettings};
pub use status::{SuccessBanner, UploadStatus, success_message};
pub use progress_aggregator::{
    BatchProgress,
    ProgressAggregator,
    ProgressSnapshot,
    overall_progress,
    task_fraction,
};
pub use progress_stream::{ProgressEvent, ProgressSender, ProgressStream};
pub use types::{
    BatchReport,
    Payload,
    TaskState,
    UploadEvent,
    UploadFile,
    UploadId,
    UploadTask,
};
