use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extensions classified as video when no explicit tag is present
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// Image files accepted for upload
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "avif", "heic", "heif", "tif", "tiff", "ico",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Video,
}

impl ResourceKind {
    /// Infer the kind from the file extension of the URL path
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last_segment = path.rsplit('/').next().unwrap_or(path);

        match last_segment.rsplit_once('.') {
            Some((_, ext)) if VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)) => {
                ResourceKind::Video
            }
            _ => ResourceKind::Image,
        }
    }

    /// Kind of a local file, `None` when it is neither image nor video
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;

        if VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)) {
            Some(ResourceKind::Video)
        } else if IMAGE_EXTENSIONS.iter().any(|i| i.eq_ignore_ascii_case(ext)) {
            Some(ResourceKind::Image)
        } else {
            None
        }
    }

    /// Media-host tags other than image/video (e.g. "raw") are unknown
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => Some(ResourceKind::Image),
            "video" => Some(ResourceKind::Video),
            _ => None,
        }
    }

    /// Explicit tag wins over extension inference
    pub fn resolve(tag: Option<&str>, url: &str) -> Self {
        tag.and_then(ResourceKind::from_tag)
            .unwrap_or_else(|| ResourceKind::from_url(url))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media-host response for one successful upload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /cloudinary/upload-link`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewLink {
    pub url: String,
    pub public_id: String,
    pub original_filename: Option<String>,
    pub resource_type: Option<String>,
    pub bytes: u64,
    pub created_at: Option<String>,
}

impl From<&UploadedMedia> for NewLink {
    fn from(media: &UploadedMedia) -> Self {
        Self {
            url: media.secure_url.clone(),
            public_id: media.public_id.clone(),
            original_filename: media.original_filename.clone(),
            resource_type: media.resource_type.clone(),
            bytes: media.bytes,
            created_at: media.created_at.clone(),
        }
    }
}

/// One row of `GET /cloudinary/links`, as the backend stores it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredLink {
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default, rename = "uploadedAt")]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Normalised unit of uploaded media, the shape the gallery displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub public_id: String,
    pub secure_url: String,
    pub original_filename: Option<String>,
    pub bytes: u64,
    pub resource_kind: ResourceKind,
    pub created_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    /// Original filename, falling back to the identifier
    pub fn display_name(&self) -> &str {
        match self.original_filename.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.public_id,
        }
    }

    pub fn is_video(&self) -> bool {
        self.resource_kind == ResourceKind::Video
    }

    pub fn from_link(link: StoredLink) -> Self {
        let resource_kind = ResourceKind::resolve(link.resource_type.as_deref(), &link.url);
        let created_at = link.uploaded_at
            .as_deref()
            .or(link.created_at.as_deref())
            .and_then(parse_timestamp);

        Self {
            public_id: link.public_id,
            secure_url: link.url,
            original_filename: link.original_filename,
            bytes: link.bytes.unwrap_or(0),
            resource_kind,
            created_at,
        }
    }

    pub fn from_new_link(link: &NewLink) -> Self {
        Self {
            public_id: link.public_id.clone(),
            secure_url: link.url.clone(),
            original_filename: link.original_filename.clone(),
            bytes: link.bytes,
            resource_kind: ResourceKind::resolve(link.resource_type.as_deref(), &link.url),
            created_at: link.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// RFC 3339 first, then the bare `YYYY-MM-DDTHH:MM:SS` some backends write
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, resource_type: Option<&str>) -> StoredLink {
        StoredLink {
            url: url.to_string(),
            public_id: "abc123".to_string(),
            original_filename: None,
            resource_type: resource_type.map(String::from),
            bytes: None,
            uploaded_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ResourceKind::from_url("https://cdn.test/v1/clip.webm"), ResourceKind::Video);
        assert_eq!(ResourceKind::from_url("https://cdn.test/v1/CLIP.MOV"), ResourceKind::Video);
        assert_eq!(ResourceKind::from_url("https://cdn.test/v1/photo.png"), ResourceKind::Image);
        assert_eq!(ResourceKind::from_url("https://cdn.test/v1/clip.mp4?dl=1"), ResourceKind::Video);
        assert_eq!(ResourceKind::from_url("https://cdn.test/v1/noext"), ResourceKind::Image);
    }

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(ResourceKind::from_file_name("clip.MOV"), Some(ResourceKind::Video));
        assert_eq!(ResourceKind::from_file_name("photo.final.JPEG"), Some(ResourceKind::Image));
        assert_eq!(ResourceKind::from_file_name("notes.txt"), None);
        assert_eq!(ResourceKind::from_file_name("README"), None);
    }

    #[test]
    fn test_explicit_tag_wins() {
        let record = MediaRecord::from_link(link("https://cdn.test/clip.webm", Some("image")));
        assert_eq!(record.resource_kind, ResourceKind::Image);

        let record = MediaRecord::from_link(link("https://cdn.test/photo.png", Some("video")));
        assert_eq!(record.resource_kind, ResourceKind::Video);

        // unknown tag falls back to inference
        let record = MediaRecord::from_link(link("https://cdn.test/clip.avi", Some("raw")));
        assert_eq!(record.resource_kind, ResourceKind::Video);
    }

    #[test]
    fn test_normalise_stored_link() {
        let json = r#"{
            "_id": "66a1",
            "url": "https://cdn.test/a.png",
            "public_id": "a",
            "original_filename": "holiday",
            "uploadedAt": "2025-03-01T10:00:00.000Z"
        }"#;
        let stored: StoredLink = serde_json::from_str(json).unwrap();
        let record = MediaRecord::from_link(stored);

        assert_eq!(record.secure_url, "https://cdn.test/a.png");
        assert_eq!(record.bytes, 0);
        assert_eq!(record.display_name(), "holiday");
        assert_eq!(record.created_at.unwrap().to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut record = MediaRecord::from_link(link("https://cdn.test/a.png", None));
        assert_eq!(record.display_name(), "abc123");

        record.original_filename = Some(String::new());
        assert_eq!(record.display_name(), "abc123");
    }

    #[test]
    fn test_new_link_serialises_backend_shape() {
        let media = UploadedMedia {
            secure_url: "https://cdn.test/a.png".to_string(),
            public_id: "a".to_string(),
            original_filename: Some("a".to_string()),
            resource_type: Some("image".to_string()),
            bytes: 1000,
            created_at: Some("2025-03-01T10:00:00Z".to_string()),
        };
        let value = serde_json::to_value(NewLink::from(&media)).unwrap();

        assert_eq!(value["url"], "https://cdn.test/a.png");
        assert_eq!(value["bytes"], 1000);
        assert_eq!(value["resource_type"], "image");
    }
}
