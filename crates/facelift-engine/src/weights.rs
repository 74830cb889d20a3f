//! Checkpoint provisioning.
//!
//! Runs once at process start, before the serving loop accepts jobs:
//! [`map_network_volume`] links the shared volume into place (warn-only for
//! the caller), then [`sync_checkpoints`] guarantees the weight file exists
//! locally, downloading it when absent. The process must not serve jobs
//! without weights, so the caller treats a sync failure as fatal.

use std::path::PathBuf;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

/// Default weight file name for the clean v1.4 export.
pub const DEFAULT_WEIGHTS_FILE: &str = "GFPGANv1.4.onnx";

/// Where weights live and where they come from.
#[derive(Debug, Clone)]
pub struct WeightsConfig {
    /// Local directory holding weight files.
    pub weights_dir: PathBuf,
    /// Weight file name inside `weights_dir`.
    pub weights_file: String,
    /// Remote URL to fetch the weight file from when missing.
    pub weights_url: String,
    /// Shared network volume expected to hold pre-provisioned weights.
    pub volume_dir: Option<PathBuf>,
}

impl WeightsConfig {
    /// Full path of the weight file.
    pub fn weights_path(&self) -> PathBuf {
        self.weights_dir.join(&self.weights_file)
    }
}

/// Link the shared network volume's weights directory into `weights_dir`.
///
/// Non-fatal: when the volume is not mounted the caller only warns and the
/// subsequent sync falls back to downloading.
pub async fn map_network_volume(config: &WeightsConfig) -> EngineResult<()> {
    let volume_dir = match &config.volume_dir {
        Some(dir) => dir.clone(),
        None => {
            debug!("No network volume configured, skipping mapping");
            return Ok(());
        }
    };

    if !volume_dir.is_dir() {
        return Err(EngineError::VolumeUnavailable(format!(
            "{} is not a mounted directory",
            volume_dir.display()
        )));
    }

    if config.weights_dir.exists() {
        debug!(
            "Weights dir {} already present, leaving volume unmapped",
            config.weights_dir.display()
        );
        return Ok(());
    }

    if let Some(parent) = config.weights_dir.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::symlink(&volume_dir, &config.weights_dir)
        .await
        .map_err(|e| {
            EngineError::VolumeUnavailable(format!(
                "failed to link {} -> {}: {}",
                config.weights_dir.display(),
                volume_dir.display(),
                e
            ))
        })?;

    info!(
        "Mapped network volume {} -> {}",
        volume_dir.display(),
        config.weights_dir.display()
    );
    Ok(())
}

/// Ensure the weight file exists locally, downloading it when absent.
///
/// Returns the path of the weight file on success.
pub async fn sync_checkpoints(config: &WeightsConfig) -> EngineResult<PathBuf> {
    let path = config.weights_path();

    if path.is_file() {
        debug!("Checkpoint already present at {}", path.display());
        return Ok(path);
    }

    info!(
        "Checkpoint missing, downloading {} to {}",
        config.weights_url,
        path.display()
    );

    tokio::fs::create_dir_all(&config.weights_dir).await?;

    let response = reqwest::get(&config.weights_url).await.map_err(|e| {
        EngineError::checkpoint_download_failed(format!("{}: {}", config.weights_url, e))
    })?;

    if !response.status().is_success() {
        return Err(EngineError::checkpoint_download_failed(format!(
            "{} returned HTTP {}",
            config.weights_url,
            response.status()
        )));
    }

    // Download to a temp name, then rename so a crashed download never
    // leaves a truncated checkpoint in place.
    let tmp_path = path.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            EngineError::checkpoint_download_failed(format!("stream interrupted: {}", e))
        })?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, &path).await?;

    info!("Checkpoint ready at {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(dir: &Path, url: String) -> WeightsConfig {
        WeightsConfig {
            weights_dir: dir.to_path_buf(),
            weights_file: DEFAULT_WEIGHTS_FILE.to_string(),
            weights_url: url,
            volume_dir: None,
        }
    }

    #[tokio::test]
    async fn test_sync_skips_when_present() {
        let dir = TempDir::new().unwrap();
        let weights = dir.path().join(DEFAULT_WEIGHTS_FILE);
        tokio::fs::write(&weights, b"weights").await.unwrap();

        // URL is unreachable on purpose; present file means no request
        let cfg = config(dir.path(), "http://127.0.0.1:1/model.onnx".to_string());
        let got = sync_checkpoints(&cfg).await.unwrap();
        assert_eq!(got, weights);
    }

    #[tokio::test]
    async fn test_sync_downloads_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/model.onnx"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"model bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path(), format!("{}/model.onnx", server.uri()));

        let got = sync_checkpoints(&cfg).await.unwrap();
        assert_eq!(tokio::fs::read(&got).await.unwrap(), b"model bytes");
        // No .part residue
        assert!(!got.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_sync_fails_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/model.onnx"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path(), format!("{}/model.onnx", server.uri()));

        let err = sync_checkpoints(&cfg).await.unwrap_err();
        assert!(matches!(err, EngineError::CheckpointDownloadFailed(_)));
        assert!(!cfg.weights_path().exists());
    }

    #[tokio::test]
    async fn test_map_volume_unmounted_is_error() {
        let dir = TempDir::new().unwrap();
        let cfg = WeightsConfig {
            weights_dir: dir.path().join("weights"),
            weights_file: DEFAULT_WEIGHTS_FILE.to_string(),
            weights_url: String::new(),
            volume_dir: Some(dir.path().join("no-such-volume")),
        };

        let err = map_network_volume(&cfg).await.unwrap_err();
        assert!(matches!(err, EngineError::VolumeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_map_volume_links_weights_dir() {
        let dir = TempDir::new().unwrap();
        let volume = dir.path().join("volume");
        tokio::fs::create_dir_all(&volume).await.unwrap();
        tokio::fs::write(volume.join(DEFAULT_WEIGHTS_FILE), b"w")
            .await
            .unwrap();

        let cfg = WeightsConfig {
            weights_dir: dir.path().join("weights"),
            weights_file: DEFAULT_WEIGHTS_FILE.to_string(),
            weights_url: String::new(),
            volume_dir: Some(volume),
        };

        map_network_volume(&cfg).await.unwrap();
        assert!(cfg.weights_path().is_file());
    }

    #[tokio::test]
    async fn test_map_volume_skipped_without_config() {
        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path(), String::new());
        map_network_volume(&cfg).await.unwrap();
    }
}
