use std::sync::{Arc, Weak};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::warn;
use url::Url;
use crate::config::Config;
use crate::errors::{Result, UploadError};
use crate::media::{NewLink, StoredLink};

/// Invoked when a secured call comes back 401/403
#[async_trait]
pub trait AuthHook: Send + Sync {
    async fn on_unauthorized(&self, status_code: u16);
}

#[derive(Serialize)]
struct SessionBody<'a> {
    email: Option<&'a str>,
}

/// Backend API client; carries the session cookie between calls
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth_hook: Arc<RwLock<Option<Weak<dyn AuthHook>>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()?;

        Self::with_client(client, base_url)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()?;

        Self::with_client(client, &config.api_base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| UploadError::Config(format!("Invalid api base url {:?}: {}", base_url, err)))?;

        if base_url.cannot_be_a_base() {
            return Err(UploadError::Config(format!("Invalid api base url {:?}", base_url.as_str())));
        }

        Ok(Self {
            client,
            base_url,
            auth_hook: Arc::new(RwLock::new(None)),
        })
    }

    /// Held weakly, the hook usually owns this client
    pub fn set_auth_hook(&self, hook: Weak<dyn AuthHook>) {
        *self.auth_hook.write() = Some(hook);
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::Config(format!("Invalid api base url {:?}", self.base_url.as_str())))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send_public(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(UploadError::Auth { status_code: status.as_u16() });
        }

        check_status(response).await
    }

    /// Like `send_public`, but 401/403 tear the session down first
    async fn send_secure(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "Secured call rejected, tearing down session");

            let hook = self.auth_hook.read().as_ref().and_then(Weak::upgrade);
            if let Some(hook) = hook {
                hook.on_unauthorized(status.as_u16()).await;
            }

            return Err(UploadError::Auth { status_code: status.as_u16() });
        }

        Ok(response)
    }

    /// `POST /jwt`
    pub async fn establish_session(&self, email: Option<&str>) -> Result<()> {
        let url = self.endpoint(&["jwt"])?;
        self.send_public(self.client.post(url).json(&SessionBody { email })).await?;
        Ok(())
    }

    /// `POST /logout`
    pub async fn end_session(&self, email: Option<&str>) -> Result<()> {
        let url = self.endpoint(&["logout"])?;
        self.send_public(self.client.post(url).json(&SessionBody { email })).await?;
        Ok(())
    }

    /// `GET /cloudinary/links`
    pub async fn list_links(&self) -> Result<Vec<StoredLink>> {
        let url = self.endpoint(&["cloudinary", "links"])?;
        let response = self.send_secure(self.client.get(url)).await?;
        let response = check_status(response).await?;

        // an empty body reads as no links
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Vec::new());
        }

        let links = serde_json::from_slice::<Option<Vec<StoredLink>>>(&body)?;
        Ok(links.unwrap_or_default())
    }

    /// `POST /cloudinary/upload-link`
    pub async fn create_link(&self, link: &NewLink) -> Result<()> {
        let url = self.endpoint(&["cloudinary", "upload-link"])?;
        let response = self.send_secure(self.client.post(url).json(link)).await?;
        check_status(response).await?;
        Ok(())
    }

    /// `DELETE /cloudinary/delete-link/{public_id}`
    pub async fn delete_link(&self, public_id: &str) -> Result<()> {
        let url = self.endpoint(&["cloudinary", "delete-link", public_id])?;
        let response = self.send_secure(self.client.delete(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(UploadError::NotFound(public_id.to_string()));
        }

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(UploadError::persistence(status.as_u16(), message))
}
