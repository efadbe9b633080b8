use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use freefeel::api::{ApiClient, AuthHook};
use freefeel::errors::UploadError;
use freefeel::links::{DEFAULT_LINKS_TTL, LinkReconciler, RemoteLinkStore};
use freefeel::media::ResourceKind;
use freefeel::upload::{BatchUploader, CloudinaryClient, UploadFile, UploadSettings};

fn hosted(public_id: &str, ext: &str, resource_type: &str, bytes: u64) -> serde_json::Value {
    json!({
        "secure_url": format!("https://res.cloudinary.test/demo/{}.{}", public_id, ext),
        "public_id": public_id,
        "original_filename": public_id,
        "resource_type": resource_type,
        "bytes": bytes,
        "created_at": "2025-03-01T10:00:00Z",
    })
}

fn stored(public_id: &str, ext: &str, bytes: u64) -> serde_json::Value {
    json!({
        "url": format!("https://res.cloudinary.test/demo/{}.{}", public_id, ext),
        "public_id": public_id,
        "original_filename": public_id,
        "bytes": bytes,
        "uploadedAt": "2025-03-01T10:00:01Z",
    })
}

struct Harness {
    media_host: MockServer,
    backend: MockServer,
    api: ApiClient,
    links: Arc<LinkReconciler>,
    uploader: BatchUploader,
}

async fn harness() -> Harness {
    let media_host = MockServer::start().await;
    let backend = MockServer::start().await;

    let host = CloudinaryClient::new("demo", "unsigned").with_base_url(&media_host.uri());
    let api = ApiClient::new(&backend.uri()).unwrap();
    let links = Arc::new(LinkReconciler::new(
        Arc::new(RemoteLinkStore::new(api.clone())),
        DEFAULT_LINKS_TTL,
    ));
    let uploader = BatchUploader::new(Arc::new(host), links.clone(), UploadSettings::default());

    Harness {
        media_host,
        backend,
        api,
        links,
        uploader,
    }
}

async fn mount_hosted(server: &MockServer, file_name: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/demo/auto/upload"))
        .and(body_string_contains(format!("filename=\"{}\"", file_name)))
        .and(body_string_contains("unsigned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_uploads_persists_and_refreshes() {
    let h = harness().await;
    mount_hosted(&h.media_host, "a.png", hosted("a", "png", "image", 12)).await;
    mount_hosted(&h.media_host, "b.mp4", hosted("b", "mp4", "video", 20)).await;

    Mock::given(method("POST"))
        .and(path("/cloudinary/upload-link"))
        .and(body_partial_json(json!({ "public_id": "a", "bytes": 12 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&h.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/cloudinary/upload-link"))
        .and(body_partial_json(json!({ "public_id": "b", "resource_type": "video" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&h.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudinary/links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("a", "png", 12),
            stored("b", "mp4", 20),
        ])))
        .expect(1)
        .mount(&h.backend)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("b.mp4");
    tokio::fs::write(&video, b"video-bytes-on-disk!").await.unwrap();

    let files = vec![
        UploadFile::from_bytes("a.png", &b"image-bytes!"[..]),
        UploadFile::from_path(&video).await.unwrap(),
    ];
    let report = h.uploader.upload_batch(files, CancellationToken::new()).await.unwrap();

    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(report.message.as_deref(), Some("Successfully uploaded 2 files!"));

    let records = h.links.current();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].resource_kind, ResourceKind::Image);
    assert_eq!(records[1].resource_kind, ResourceKind::Video);
    assert!(records[1].created_at.is_some());

    assert_eq!(h.uploader.status().progress, 100);
}

#[tokio::test]
async fn test_media_host_failure_skips_persistence() {
    let h = harness().await;
    mount_hosted(&h.media_host, "a.png", hosted("a", "png", "image", 3)).await;
    Mock::given(method("POST"))
        .and(path("/demo/auto/upload"))
        .and(body_string_contains("filename=\"b.png\""))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid image file"))
        .mount(&h.media_host)
        .await;
    Mock::given(method("POST"))
        .and(path("/cloudinary/upload-link"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&h.backend)
        .await;

    let files = vec![
        UploadFile::from_bytes("a.png", &b"aaa"[..]),
        UploadFile::from_bytes("b.png", &b"bbb"[..]),
    ];
    let err = h.uploader.upload_batch(files, CancellationToken::new()).await.unwrap_err();

    match err {
        UploadError::Transport { file_name, source } => {
            assert_eq!(file_name, "b.png");
            assert!(matches!(*source, UploadError::MediaHostStatus { status_code: 400, ref message } if message == "Invalid image file"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(h.uploader.status().error.unwrap().starts_with("Upload failed for b.png"));
}

#[tokio::test]
async fn test_delete_then_refresh() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/cloudinary/links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("abc123", "png", 1),
            stored("keep", "webm", 2),
        ])))
        .up_to_n_times(1)
        .mount(&h.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudinary/links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored("keep", "webm", 2)])))
        .mount(&h.backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cloudinary/delete-link/abc123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.backend)
        .await;

    let records = h.links.fetch().await.unwrap();
    assert_eq!(records.len(), 2);

    h.uploader.delete(&records[0]).await.unwrap();

    let records = h.links.current();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].public_id, "keep");
    assert!(records[0].is_video());
}

#[tokio::test]
async fn test_delete_missing_and_empty_list() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/cloudinary/links"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&h.backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cloudinary/delete-link/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.backend)
        .await;

    assert!(h.api.list_links().await.unwrap().is_empty());
    assert!(matches!(h.api.delete_link("gone").await, Err(UploadError::NotFound(id)) if id == "gone"));
}

struct CountingHook(AtomicUsize);

#[async_trait]
impl AuthHook for CountingHook {
    async fn on_unauthorized(&self, _status_code: u16) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_unauthorized_persistence_runs_hook_without_banner() {
    let h = harness().await;
    let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
    let weak: std::sync::Weak<CountingHook> = Arc::downgrade(&hook);
    h.api.set_auth_hook(weak);

    mount_hosted(&h.media_host, "a.png", hosted("a", "png", "image", 3)).await;
    Mock::given(method("POST"))
        .and(path("/cloudinary/upload-link"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.backend)
        .await;

    let err = h.uploader
        .upload_batch(vec![UploadFile::from_bytes("a.png", &b"aaa"[..])], CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Auth { status_code: 401 }));
    assert_eq!(hook.0.load(Ordering::SeqCst), 1);

    let status = h.uploader.status();
    assert!(!status.uploading);
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn test_download_streams_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demo/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/demo/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = CloudinaryClient::new("demo", "unsigned");
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.png");

    let written = client.download(&format!("{}/demo/a.png", server.uri()), &dest).await.unwrap();
    assert_eq!(written, 4096);
    assert_eq!(tokio::fs::read(&dest).await.unwrap().len(), 4096);

    let err = client
        .download(&format!("{}/demo/missing.png", server.uri()), dir.path().join("m.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::MediaHostStatus { status_code: 404, .. }));
}
