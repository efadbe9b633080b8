pub mod api;
pub mod config;
pub mod errors;
pub mod links;
pub mod media;
pub mod session;
pub mod upload;
pub mod utils;

pub use api::{ApiClient, AuthHook};
pub use config::{Config, get_config, init_config};
pub use errors::{Result, UploadError};
pub use links::{InMemoryLinkStore, LinkReconciler, LinkStore, RemoteLinkStore};
pub use media::{FilterKind, GalleryView, MediaRecord, ResourceKind, ViewMode};
pub use session::{IdentityProvider, SessionManager, SessionState, User};
pub use upload::{
    BatchReport,
    BatchUploader,
    CloudinaryClient,
    MediaHost,
    UploadEvent,
    UploadFile,
    UploadSettings,
    UploadStatus,
};
