//! Worker configuration.
//!
//! Everything that was a hardcoded path or module-level constant in earlier
//! incarnations lives here and is passed into components at construction.

use std::path::PathBuf;
use std::time::Duration;

use facelift_engine::{weights::DEFAULT_WEIGHTS_FILE, WeightsConfig};

/// Default GFPGAN v1.4 ONNX export location.
const DEFAULT_WEIGHTS_URL: &str =
    "https://huggingface.co/leonelhs/gfpgan/resolve/main/GFPGANv1.4.onnx";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Address the job-serving endpoint binds to
    pub listen_addr: String,
    /// Work directory for per-job temporary files
    pub work_dir: PathBuf,
    /// Local directory holding model weights
    pub weights_dir: PathBuf,
    /// Weight file name inside the weights directory
    pub weights_file: String,
    /// URL to fetch weights from when missing locally
    pub weights_url: String,
    /// Shared network volume expected to hold pre-provisioned weights
    pub volume_dir: Option<PathBuf>,
    /// Timeout applied to source video downloads
    pub download_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            work_dir: PathBuf::from("/tmp/facelift"),
            weights_dir: PathBuf::from("/app/gfpgan/weights"),
            weights_file: DEFAULT_WEIGHTS_FILE.to_string(),
            weights_url: DEFAULT_WEIGHTS_URL.to_string(),
            volume_dir: None,
            download_timeout: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("WORKER_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            weights_dir: std::env::var("WORKER_WEIGHTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.weights_dir),
            weights_file: std::env::var("WORKER_WEIGHTS_FILE").unwrap_or(defaults.weights_file),
            weights_url: std::env::var("WORKER_WEIGHTS_URL").unwrap_or(defaults.weights_url),
            volume_dir: std::env::var("WORKER_VOLUME_DIR").ok().map(PathBuf::from),
            download_timeout: Duration::from_secs(
                std::env::var("WORKER_DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }

    /// Checkpoint provisioning view of this config.
    pub fn weights(&self) -> WeightsConfig {
        WeightsConfig {
            weights_dir: self.weights_dir.clone(),
            weights_file: self.weights_file.clone(),
            weights_url: self.weights_url.clone(),
            volume_dir: self.volume_dir.clone(),
        }
    }

    /// Full path of the weight file.
    pub fn weights_path(&self) -> PathBuf {
        self.weights_dir.join(&self.weights_file)
    }
}
