use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use serde::Deserialize;
use crate::errors::{Result, UploadError};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_MEDIA_HOST_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Media host account the uploads land in
    pub cloud_name: String,
    /// Unsigned upload preset sent with every file
    pub upload_preset: String,
    pub api_base_url: String,
    #[serde(default = "default_media_host_base")]
    pub media_host_base: String,
    /// Freshness window of the cached link list
    #[serde(default = "default_links_ttl")]
    pub links_ttl_secs: u64,
    #[serde(default = "default_success_banner")]
    pub success_banner_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_media_host_base() -> String {
    DEFAULT_MEDIA_HOST_BASE.to_string()
}

fn default_links_ttl() -> u64 {
    5 * 60
}

fn default_success_banner() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    300
}

impl Config {
    pub fn new(cloud_name: &str, upload_preset: &str, api_base_url: &str) -> Self {
        Self {
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
            api_base_url: api_base_url.to_string(),
            media_host_base: default_media_host_base(),
            links_ttl_secs: default_links_ttl(),
            success_banner_secs: default_success_banner(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn from_toml(config_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .map_err(|err| UploadError::Config(format!("Can't read {}: {}", path.display(), err)))?;

        Config::from_toml(&config_str)
    }

    /// Overlay `FREEFEEL_*` environment variables on top of a loaded config
    pub fn with_env_overrides(mut self) -> Self {
        let overrides = [
            ("FREEFEEL_CLOUD_NAME", &mut self.cloud_name),
            ("FREEFEEL_UPLOAD_PRESET", &mut self.upload_preset),
            ("FREEFEEL_API_BASE_URL", &mut self.api_base_url),
        ];

        for (key, slot) in overrides {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }

        self
    }

    /// Build a config from environment variables only
    pub fn from_env() -> Result<Config> {
        let config = Config::new("", "", "").with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cloud_name.is_empty() {
            return Err(UploadError::Config("cloud_name is empty".to_string()));
        }
        if self.upload_preset.is_empty() {
            return Err(UploadError::Config("upload_preset is empty".to_string()));
        }
        url::Url::parse(&self.api_base_url)
            .map_err(|err| UploadError::Config(format!("Invalid api_base_url {:?}: {}", self.api_base_url, err)))?;
        url::Url::parse(&self.media_host_base)
            .map_err(|err| UploadError::Config(format!("Invalid media_host_base {:?}: {}", self.media_host_base, err)))?;

        Ok(())
    }

    pub fn links_ttl(&self) -> Duration {
        Duration::from_secs(self.links_ttl_secs)
    }

    pub fn success_banner(&self) -> Duration {
        Duration::from_secs(self.success_banner_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load `config.toml` once per process
pub fn init_config() -> Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = Config::load("config.toml")?.with_env_overrides();
    Ok(CONFIG.get_or_init(|| config))
}

pub fn get_config() -> Option<&'static Config> {
    CONFIG.get()
}
