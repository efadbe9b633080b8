use std::sync::Arc;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use freefeel::config::init_config;
use freefeel::links::{InMemoryLinkStore, LinkReconciler};
use freefeel::media::GalleryView;
use freefeel::upload::{BatchUploader, CloudinaryClient, UploadEvent, UploadFile, UploadSettings};
use freefeel::utils::{format_file_size, format_uploaded_at};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = init_config().context("loading config.toml")?;

    let mut files = Vec::new();
    for path in std::env::args().skip(1) {
        files.push(UploadFile::from_path(&path).await.with_context(|| format!("reading {}", path))?);
    }

    let host = Arc::new(CloudinaryClient::from_config(config)?);
    let links = Arc::new(LinkReconciler::new(Arc::new(InMemoryLinkStore::new()), config.links_ttl()));
    let uploader = BatchUploader::new(host, links.clone(), UploadSettings::from(config));

    let mut events = uploader.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let UploadEvent::Progress(progress) = event {
                info!(
                    percent = progress.percent,
                    file = progress.current_file,
                    completed = progress.completed,
                    total = progress.total_files,
                    "Progress"
                );
            }
        }
    });

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let report = uploader.upload_batch(files, cancel).await?;
    if let Some(message) = &report.message {
        println!("{}", message);
    }

    let records = links.fetch().await?;
    let view = GalleryView::default();
    let shown = view.apply(&records);
    for record in &shown {
        let uploaded_at = record.created_at.as_ref().map(format_uploaded_at).unwrap_or_default();
        println!(
            "{:<6} {:>10}  {:<22} {}  {}",
            record.resource_kind.as_str(),
            format_file_size(record.bytes),
            uploaded_at,
            record.display_name(),
            record.secure_url,
        );
    }
    println!("{}", view.summary(shown.len(), records.len()));

    Ok(())
}
