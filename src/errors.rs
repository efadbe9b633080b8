use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// One file of a batch could not be uploaded
    #[error("Upload failed for {file_name}: {source}")]
    Transport {
        file_name: String,
        #[source]
        source: Box<UploadError>,
    },

    #[error("Media host error: status code {status_code}, message: {message}")]
    MediaHostStatus {
        status_code: u16,
        message: String,
    },

    /// Backend rejected a create/delete/fetch
    #[error("Persistence error: status code {status_code}, message: {message}")]
    Persistence {
        status_code: u16,
        message: String,
    },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Not authorized: status code {status_code}")]
    Auth {
        status_code: u16,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload was cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn transport(file_name: impl Into<String>, source: UploadError) -> Self {
        Self::Transport {
            file_name: file_name.into(),
            source: Box::new(source),
        }
    }

    pub fn media_host(status_code: u16, message: impl Into<String>) -> Self {
        Self::MediaHostStatus {
            status_code,
            message: message.into(),
        }
    }

    pub fn persistence(status_code: u16, message: impl Into<String>) -> Self {
        Self::Persistence {
            status_code,
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 401/403 from a secured backend call
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

impl From<toml::de::Error> for UploadError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_transport_keeps_source() {
        let err = UploadError::transport("b.png", UploadError::media_host(400, "Invalid image file"));

        assert_eq!(
            err.to_string(),
            "Upload failed for b.png: Media host error: status code 400, message: Invalid image file"
        );

        let source = err.source().unwrap().downcast_ref::<UploadError>().unwrap();
        assert!(matches!(source, UploadError::MediaHostStatus { status_code: 400, .. }));
    }
}
