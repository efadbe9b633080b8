use tokio::time::Instant;

/// Auto-expiring success banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessBanner {
    pub message: String,
    pub expires_at: Instant,
}

/// Observable upload state consumed by the display layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadStatus {
    pub uploading: bool,
    pub progress: u8,
    pub current_file: usize,
    pub completed: usize,
    pub total_files: usize,
    /// Stays until dismissed
    pub error: Option<String>,
    pub success: Option<SuccessBanner>,
}

impl UploadStatus {
    pub fn success_message(&self) -> Option<&str> {
        self.success_message_at(Instant::now())
    }

    pub fn success_message_at(&self, now: Instant) -> Option<&str> {
        self.success
            .as_ref()
            .filter(|banner| now < banner.expires_at)
            .map(|banner| banner.message.as_str())
    }
}

pub fn success_message(uploaded: usize) -> String {
    if uploaded == 1 {
        "Successfully uploaded 1 file!".to_string()
    } else {
        format!("Successfully uploaded {} files!", uploaded)
    }
}
