//! Source video download over HTTP.
//!
//! Jobs carry a direct URL to the input video, so this is a plain streaming
//! GET to a local file. There is no retry, resumption, or checksum
//! verification; an unreachable resource or failed write surfaces as a
//! `MediaError::DownloadFailed` and any partial file is removed best-effort.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Download a remote video to `dest`.
///
/// The parent directory is created only once the request succeeds, so a
/// failed request touches nothing on disk. On any failure after the file was
/// opened, the partial download is deleted before returning.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: impl AsRef<Path>,
) -> MediaResult<()> {
    let dest = dest.as_ref();

    debug!("Downloading {} to {}", url, dest.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                remove_partial(dest).await;
                return Err(MediaError::download_failed(format!(
                    "stream from {} interrupted: {}",
                    url, e
                )));
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            remove_partial(dest).await;
            return Err(MediaError::download_failed(format!(
                "write to {} failed: {}",
                dest.display(),
                e
            )));
        }
        written += chunk.len() as u64;
    }

    file.flush().await?;
    info!("Downloaded {} bytes from {} to {}", written, url, dest.display());
    Ok(())
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        warn!("Failed to remove partial download {}: {}", dest.display(), e);
    }
}
