use std::path::Path;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use crate::config::{Config, DEFAULT_MEDIA_HOST_BASE};
use crate::errors::{Result, UploadError};
use crate::media::UploadedMedia;
use super::progress_stream::{ProgressSender, ProgressStream};
use super::types::UploadFile;

/// One upload request per file against an external media host
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, file: &UploadFile, progress: ProgressSender) -> Result<UploadedMedia>;
}

#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    upload_preset: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: &str, upload_preset: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_MEDIA_HOST_BASE.to_string(),
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.media_host_base.clone(),
            cloud_name: config.cloud_name.clone(),
            upload_preset: config.upload_preset.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", self.base_url.trim_end_matches('/'), self.cloud_name)
    }

    /// Stream a record's URL into `dest`, returning the bytes written
    pub async fn download(&self, url: &str, dest: impl AsRef<Path>) -> Result<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::media_host(
                status.as_u16(),
                format!("Download failed with status {}", status),
            ));
        }

        let mut file = tokio::fs::File::create(dest.as_ref()).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, file: &UploadFile, progress: ProgressSender) -> Result<UploadedMedia> {
        let body = Body::wrap_stream(ProgressStream::new(file.body_stream().await?, progress));
        let part = Part::stream_with_length(body, file.size).file_name(file.name.clone());
        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        debug!(file = %file.name, size = file.size, "Uploading to media host");

        let response = self.client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::media_host(status.as_u16(), message));
        }

        let media = response.json::<UploadedMedia>().await?;
        Ok(media)
    }
}
