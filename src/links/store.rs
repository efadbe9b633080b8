use async_trait::async_trait;
use parking_lot::RwLock;
use crate::api::ApiClient;
use crate::errors::{Result, UploadError};
use crate::media::{MediaRecord, NewLink};

/// Authoritative home of the uploaded-media list
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn fetch(&self) -> Result<Vec<MediaRecord>>;

    async fn create(&self, link: NewLink) -> Result<()>;

    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Links persisted through the backend API
#[derive(Debug, Clone)]
pub struct RemoteLinkStore {
    api: ApiClient,
}

impl RemoteLinkStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LinkStore for RemoteLinkStore {
    async fn fetch(&self) -> Result<Vec<MediaRecord>> {
        let links = self.api.list_links().await?;
        Ok(links.into_iter().map(MediaRecord::from_link).collect())
    }

    async fn create(&self, link: NewLink) -> Result<()> {
        self.api.create_link(&link).await
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        self.api.delete_link(public_id).await
    }
}

/// Local-only configuration: results live in process memory
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    records: RwLock<Vec<MediaRecord>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn fetch(&self) -> Result<Vec<MediaRecord>> {
        Ok(self.records.read().clone())
    }

    async fn create(&self, link: NewLink) -> Result<()> {
        let mut records = self.records.write();
        if records.iter().any(|record| record.public_id == link.public_id) {
            return Err(UploadError::persistence(409, format!("Duplicate public_id {}", link.public_id)));
        }

        records.push(MediaRecord::from_new_link(&link));
        Ok(())
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| record.public_id != public_id);

        if records.len() == before {
            return Err(UploadError::NotFound(public_id.to_string()));
        }
        Ok(())
    }
}
