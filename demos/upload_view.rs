//! Example: convert an OMF file and upload it as a View
//!
//! Run with: LFVIEW_API_KEY=... cargo run --example upload_view -- model.omf

use anyhow::Context;
use lfview_client::{omf_to_view, ClientConfig, Session, UploadOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lfview_client=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: upload_view <file.omf> [thumbnail.png]")?;
    let thumbnail = std::env::args().nth(2).map(std::fs::read).transpose()?;

    let session = Session::from_config(ClientConfig::from_env()).await?;
    println!("Logged in to {} as {}/{}", session.endpoint(), session.org(), session.project());

    let (mut graph, view) = omf_to_view(&path)?;
    println!("Converted {} into {} resources", path, graph.len());

    let mut options = UploadOptions::default();
    if let Some(png) = thumbnail {
        options = options.with_thumbnail(png);
    }
    let url = session.upload(&mut graph, view, options).await?;
    println!("✓ View uploaded: {}", url);

    Ok(())
}
