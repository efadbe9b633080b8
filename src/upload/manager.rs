use std::sync::Arc;
use std::time::Duration;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::config::Config;
use crate::errors::{Result, UploadError};
use crate::links::LinkReconciler;
use crate::media::{MediaRecord, NewLink, UploadedMedia};
use super::client::MediaHost;
use super::progress_aggregator::{BatchProgress, ProgressAggregator};
use super::progress_stream::{ProgressEvent, ProgressSender};
use super::status::{SuccessBanner, UploadStatus, success_message};
use super::types::{BatchReport, TaskState, UploadEvent, UploadFile, UploadTask};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// How long the success banner stays up
    pub success_banner: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            success_banner: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for UploadSettings {
    fn from(config: &Config) -> Self {
        Self {
            success_banner: config.success_banner(),
        }
    }
}

/// Drives a batch of files through the media host, then records the results
/// in the link store.
///
/// Every upload of a batch is launched at once. The batch waits for all of
/// them; a single failure fails the batch and nothing is persisted. Already
/// uploaded files stay at the media host.
#[derive(Clone)]
pub struct BatchUploader {
    host: Arc<dyn MediaHost>,
    links: Arc<LinkReconciler>,
    settings: UploadSettings,
    status_tx: Arc<watch::Sender<UploadStatus>>,
    event_tx: broadcast::Sender<UploadEvent>,
}

impl BatchUploader {
    pub fn new(host: Arc<dyn MediaHost>, links: Arc<LinkReconciler>, settings: UploadSettings) -> Self {
        let (status_tx, _) = watch::channel(UploadStatus::default());
        let (event_tx, _) = broadcast::channel(256);

        Self {
            host,
            links,
            settings,
            status_tx: Arc::new(status_tx),
            event_tx,
        }
    }

    pub fn links(&self) -> &Arc<LinkReconciler> {
        &self.links
    }

    pub fn status(&self) -> UploadStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UploadStatus> {
        self.status_tx.subscribe()
    }

    /// Slow subscribers may miss events (lagged)
    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }

    pub fn clear_error(&self) {
        self.status_tx.send_modify(|status| status.error = None);
    }

    pub fn clear_success(&self) {
        self.status_tx.send_modify(|status| status.success = None);
    }

    /// Files that are neither image nor video are dropped before anything
    /// starts. A batch left empty is a no-op.
    pub async fn upload_batch(&self, files: Vec<UploadFile>, cancel: CancellationToken) -> Result<BatchReport> {
        let files: Vec<UploadFile> = files.into_iter()
            .filter(|file| {
                let supported = file.kind().is_some();
                if !supported {
                    debug!(file = %file.name, "Skipping unsupported file type");
                }
                supported
            })
            .collect();

        if files.is_empty() {
            return Ok(BatchReport::default());
        }

        let total_files = files.len();
        info!(files = total_files, "Batch upload started");

        self.status_tx.send_modify(|status| {
            status.uploading = true;
            status.progress = 0;
            status.current_file = 0;
            status.completed = 0;
            status.total_files = total_files;
            status.error = None;
        });

        let mut tasks: Vec<UploadTask> = files.iter()
            .enumerate()
            .map(|(index, file)| UploadTask::new(index, file))
            .collect();
        let mut aggregator = ProgressAggregator::new(total_files);
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

        let mut pending = FuturesUnordered::new();
        for (index, file) in files.iter().enumerate() {
            let progress = ProgressSender::new(index, file.size, progress_tx.clone());
            let host = self.host.clone();
            let cancel = cancel.clone();

            pending.push(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(UploadError::Cancelled),
                    result = host.upload(file, progress) => result,
                };
                (index, result)
            });
            self.transition(&mut tasks[index], TaskState::InProgress);
        }
        drop(progress_tx);

        let mut results: Vec<Option<Result<UploadedMedia>>> = (0..total_files).map(|_| None).collect();
        loop {
            tokio::select! {
                Some(event) = progress_rx.recv() => {
                    self.apply_progress(&mut aggregator, &mut tasks, event);
                }
                settled = pending.next() => match settled {
                    Some((index, result)) => {
                        self.settle_task(&mut aggregator, &mut tasks[index], &result);
                        results[index] = Some(result);
                    }
                    None => break,
                },
            }
        }
        drop(pending);

        if cancel.is_cancelled() {
            info!("Batch upload cancelled");
            self.fail_batch(&UploadError::Cancelled);
            return Err(UploadError::Cancelled);
        }

        let mut uploaded = Vec::with_capacity(total_files);
        for (task, result) in tasks.iter().zip(results) {
            match result {
                Some(Ok(media)) => uploaded.push(media),
                Some(Err(err)) => {
                    let err = UploadError::transport(&task.file_name, err);
                    self.fail_batch(&err);
                    return Err(err);
                }
                None => {
                    let err = UploadError::internal_error(format!("Task {} never settled", task.index));
                    self.fail_batch(&err);
                    return Err(err);
                }
            }
        }

        self.status_tx.send_modify(|status| status.progress = 100);

        // one at a time, in selection order
        for media in &uploaded {
            if cancel.is_cancelled() {
                self.fail_batch(&UploadError::Cancelled);
                return Err(UploadError::Cancelled);
            }
            if let Err(err) = self.links.create(NewLink::from(media)).await {
                error!(public_id = %media.public_id, error = %err, "Failed to persist upload link");
                self.fail_batch(&err);
                return Err(err);
            }
        }

        if let Err(err) = self.links.refresh().await {
            warn!(error = %err, "Gallery refresh after upload failed");
        }

        let message = success_message(uploaded.len());
        let expires_at = Instant::now() + self.settings.success_banner;
        self.status_tx.send_modify(|status| {
            status.uploading = false;
            status.success = Some(SuccessBanner {
                message: message.clone(),
                expires_at,
            });
        });
        let _ = self.event_tx.send(UploadEvent::BatchCompleted { uploaded: uploaded.len() });
        info!(files = uploaded.len(), "Batch upload completed");

        Ok(BatchReport {
            uploaded,
            message: Some(message),
        })
    }

    /// Delete one record and refresh the gallery
    pub async fn delete(&self, record: &MediaRecord) -> Result<()> {
        match self.links.delete_and_refresh(&record.public_id).await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(public_id = %record.public_id, error = %err, "Delete failed");
                if !err.is_auth() {
                    let message = format!("Failed to delete {}", record.display_name());
                    self.status_tx.send_modify(|status| status.error = Some(message));
                }
                Err(err)
            }
        }
    }

    fn apply_progress(&self, aggregator: &mut ProgressAggregator, tasks: &mut [UploadTask], event: ProgressEvent) {
        if let Some(task) = tasks.get_mut(event.index) {
            task.record_bytes(event.bytes_sent, event.bytes_total);
        }

        if let Some(progress) = aggregator.record(event.index, event.bytes_sent, event.bytes_total) {
            self.publish_progress(progress);
        }
    }

    fn settle_task(&self, aggregator: &mut ProgressAggregator, task: &mut UploadTask, result: &Result<UploadedMedia>) {
        match result {
            Ok(_) => {
                self.transition(task, TaskState::Succeeded);
                if let Some(progress) = aggregator.mark_complete(task.index) {
                    self.publish_progress(progress);
                }
            }
            Err(err) => {
                warn!(file = %task.file_name, error = %err, "Upload task failed");
                task.error = Some(err.to_string());
                self.transition(task, TaskState::Failed);
            }
        }
    }

    fn publish_progress(&self, progress: BatchProgress) {
        self.status_tx.send_modify(|status| {
            status.progress = progress.percent;
            status.current_file = progress.current_file;
            status.completed = progress.completed;
        });
        let _ = self.event_tx.send(UploadEvent::Progress(progress));
    }

    fn transition(&self, task: &mut UploadTask, next: TaskState) {
        match task.transition(next) {
            Ok(old_state) => {
                let _ = self.event_tx.send(UploadEvent::StateChanged {
                    upload_id: task.id,
                    index: task.index,
                    old_state,
                    new_state: next,
                });
            }
            Err(err) => warn!(error = %err, "Task state not updated"),
        }
    }

    fn fail_batch(&self, err: &UploadError) {
        // auth failures are surfaced by the session teardown instead
        let banner = (!err.is_auth()).then(|| err.to_string());

        self.status_tx.send_modify(|status| {
            status.uploading = false;
            if banner.is_some() {
                status.error = banner.clone();
            }
        });
        let _ = self.event_tx.send(UploadEvent::BatchFailed { error: err.to_string() });
    }
}
