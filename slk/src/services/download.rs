use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::api::SlackClient;
use crate::cli::DownloadArgs;

/// Downloads larger than this get a progress bar.
const PROGRESS_THRESHOLD: u64 = 1 << 20;

const FALLBACK_NAME: &str = "download";

/// Last path segment of a file URL, percent-decoded.
pub fn filename_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Path::new(&decoded)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

pub async fn run(client: &SlackClient, args: DownloadArgs) -> Result<()> {
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(filename_from_url(&args.url).unwrap_or_else(|| FALLBACK_NAME.to_string()))
    });

    let response = client.download_file(&args.url).await?;
    let total = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("creating {}", output.display()))?;

    let progress = if total > PROGRESS_THRESHOLD {
        let bar = ProgressBar::new(total);
        bar.set_style(ProgressStyle::with_template(
            "Downloading... {percent}% [{bar:40}] {bytes}/{total_bytes}",
        )?);
        Some(bar)
    } else {
        None
    };

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("reading download")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", output.display()))?;
        written += chunk.len() as u64;
        if let Some(bar) = &progress {
            bar.set_position(written);
        }
    }
    file.flush().await?;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    println!("Downloaded {} ({} bytes)", output.display(), written);
    Ok(())
}
