//! The video enhancement pipeline.
//!
//! One sequential pass per job: download, probe, restore every frame in
//! source order, re-mux with the original audio, upload, clean up. Frames
//! are processed one at a time on a blocking thread; there is no batching or
//! cross-frame parallelism.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use facelift_engine::{Device, FaceRestorer, GfpganRestorer, RestorerOptions};
use facelift_media::encode::default_thread_queue_size;
use facelift_media::frames::{self, cleanup_dir, extract_frames};
use facelift_media::{download_file, mux_frames_command, probe_video, run_ffmpeg};
use facelift_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Orchestrates one enhancement job end to end.
pub struct VideoPipeline {
    config: WorkerConfig,
    storage: StorageClient,
    http: reqwest::Client,
}

impl VideoPipeline {
    /// Create a pipeline from config and a storage client.
    pub fn new(config: WorkerConfig, storage: StorageClient) -> WorkerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .build()
            .map_err(|e| WorkerError::config_error(format!("http client: {}", e)))?;

        Ok(Self {
            config,
            storage,
            http,
        })
    }

    /// Run the full pipeline for one source video URL.
    ///
    /// Returns the public URL of the uploaded enhanced video. Every failure
    /// comes back as a structured error; the pipeline never terminates the
    /// process.
    pub async fn enhance(&self, video_url: &str) -> WorkerResult<String> {
        info!("Processing face enhancement on {}", video_url);

        // The job dir is created by the download on a successful request; a
        // failed download leaves no directory behind.
        let job_dir = self.config.work_dir.join(Uuid::new_v4().to_string());

        let result = self.enhance_in_dir(video_url, &job_dir).await;

        // Local artifacts are disposable whatever happened; deletion
        // failures are swallowed.
        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove job dir {}: {}", job_dir.display(), e);
            }
        }

        result
    }

    async fn enhance_in_dir(&self, video_url: &str, job_dir: &Path) -> WorkerResult<String> {
        let input_path = job_dir.join("input_video.mp4");

        // 1. Download the source video; nothing else runs on failure.
        download_file(&self.http, video_url, &input_path).await?;

        // 2. Open the container; unreadable input is fatal for the job.
        let video_info = probe_video(&input_path).await?;
        if video_info.width == 0 || video_info.height == 0 {
            return Err(facelift_media::MediaError::InvalidVideo(
                "container reports zero-sized frames".to_string(),
            )
            .into());
        }
        info!(
            "Input video: {}x{} @ {:.3} fps, {} frames, audio: {}",
            video_info.width,
            video_info.height,
            video_info.fps,
            video_info.frame_count,
            video_info.has_audio
        );

        // 3. Select compute device and initialize the engine, per job.
        let device = Device::detect();
        let restorer: Arc<dyn FaceRestorer> = Arc::new(GfpganRestorer::load(
            self.config.weights_path(),
            device,
            RestorerOptions::default(),
        )?);

        // 4. Decode frames into a fresh temp dir.
        let frames_dir = job_dir.join("frames");
        let enhanced_dir = job_dir.join("enhanced_frames");
        let frame_count = extract_frames(&input_path, &frames_dir).await?;

        // 5. Restore frames strictly in source order, one at a time.
        let enhanced = {
            let frames_dir = frames_dir.clone();
            let enhanced_dir = enhanced_dir.clone();
            let restorer = Arc::clone(&restorer);
            let (width, height) = (video_info.width, video_info.height);
            tokio::task::spawn_blocking(move || {
                enhance_frames(
                    &frames_dir,
                    &enhanced_dir,
                    frame_count,
                    width,
                    height,
                    restorer.as_ref(),
                )
            })
            .await
            .map_err(|e| WorkerError::processing_failed(format!("frame task panicked: {}", e)))??
        };
        info!("Enhanced {} frames", enhanced);

        // 6. Mux enhanced frames with the source audio; exit status checked.
        let output_path = job_dir.join(output_file_name());
        let mux = mux_frames_command(
            &enhanced_dir,
            video_info.fps,
            &input_path,
            &output_path,
            default_thread_queue_size(),
        );
        run_ffmpeg(&mux).await?;

        // 7. Temp frames are no longer needed once the container exists.
        cleanup_dir(&frames_dir).await;
        cleanup_dir(&enhanced_dir).await;

        // 8. Upload; failures surface to the handler as structured errors.
        let object_name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "enhanced.mp4".to_string());
        let url = self
            .storage
            .upload_file(&output_path, &object_name, "video/mp4")
            .await?;

        Ok(url)
    }
}

/// Timestamped output file name, e.g. `enhanced_2024_06_01_12.30.05.mp4`.
fn output_file_name() -> String {
    format!(
        "enhanced_{}.mp4",
        chrono::Local::now().format("%Y_%m_%d_%H.%M.%S")
    )
}

/// Restore `frame_count` frames from `src_dir` into `dst_dir`.
///
/// Frames keep their zero-based, 6-digit index. A frame whose raw shape
/// differs from the container's declared geometry is resized to match before
/// enhancement. Returns the number of frames written.
fn enhance_frames(
    src_dir: &Path,
    dst_dir: &Path,
    frame_count: u64,
    width: u32,
    height: u32,
    restorer: &dyn FaceRestorer,
) -> WorkerResult<u64> {
    std::fs::create_dir_all(dst_dir)?;

    for index in 0..frame_count {
        let src = frames::frame_path(src_dir, index);
        let frame = frames::load_frame(&src)?;
        let frame = frames::normalize_frame(frame, width, height);
        let restored = restorer.restore(&frame)?;
        frames::save_frame(&restored, frames::frame_path(dst_dir, index))?;
    }

    Ok(frame_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facelift_engine::{EngineResult, FaceRestorer};
    use facelift_storage::{StorageClient, StorageConfig};
    use image::RgbImage;
    use tempfile::TempDir;

    /// Stub restorer: upscales by plain resize, no model involved.
    struct StubRestorer {
        upscale: u32,
    }

    impl FaceRestorer for StubRestorer {
        fn restore(&self, frame: &RgbImage) -> EngineResult<RgbImage> {
            Ok(image::imageops::resize(
                frame,
                frame.width() * self.upscale,
                frame.height() * self.upscale,
                image::imageops::FilterType::Nearest,
            ))
        }

        fn upscale(&self) -> u32 {
            self.upscale
        }
    }

    fn seed_frames(dir: &Path, count: u64, width: u32, height: u32) {
        std::fs::create_dir_all(dir).unwrap();
        for i in 0..count {
            let img = RgbImage::new(width, height);
            frames::save_frame(&img, frames::frame_path(dir, i)).unwrap();
        }
    }

    #[test]
    fn test_enhance_frames_produces_all_indices() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("frames");
        let dst = dir.path().join("enhanced_frames");
        seed_frames(&src, 10, 640, 480);

        let restorer = StubRestorer { upscale: 2 };
        let n = enhance_frames(&src, &dst, 10, 640, 480, &restorer).unwrap();
        assert_eq!(n, 10);

        for i in 0..10 {
            let path = frames::frame_path(&dst, i);
            assert!(path.exists(), "missing {}", path.display());
        }
        assert_eq!(
            frames::frame_path(&dst, 0).file_name().unwrap(),
            "frame_000000.png"
        );
        assert!(!frames::frame_path(&dst, 10).exists());
    }

    #[test]
    fn test_enhance_frames_normalizes_mismatched_geometry() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("frames");
        let dst = dir.path().join("enhanced_frames");
        // Declared geometry is 640x480 but raw frames are 320x240
        seed_frames(&src, 3, 320, 240);

        let restorer = StubRestorer { upscale: 2 };
        enhance_frames(&src, &dst, 3, 640, 480, &restorer).unwrap();

        for i in 0..3 {
            let img = frames::load_frame(frames::frame_path(&dst, i)).unwrap();
            // Normalized to 640x480 before the 2x restorer
            assert_eq!(img.dimensions(), (1280, 960));
        }
    }

    #[test]
    fn test_enhance_frames_fails_on_missing_frame() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("frames");
        let dst = dir.path().join("enhanced_frames");
        seed_frames(&src, 2, 64, 48);

        let restorer = StubRestorer { upscale: 1 };
        // Claiming 5 frames when only 2 exist must error, not skip
        let err = enhance_frames(&src, &dst, 5, 64, 48, &restorer).unwrap_err();
        assert!(matches!(err, WorkerError::Media(_)));
    }

    #[test]
    fn test_output_file_name_shape() {
        let name = output_file_name();
        assert!(name.starts_with("enhanced_"));
        assert!(name.ends_with(".mp4"));
        // enhanced_YYYY_MM_DD_HH.MM.SS.mp4
        assert_eq!(name.len(), "enhanced_2024_06_01_12.30.05.mp4".len());
    }

    async fn test_pipeline(work_dir: &Path) -> VideoPipeline {
        let storage = StorageClient::new(StorageConfig {
            endpoint_url: "https://storage.invalid".to_string(),
            access_key_id: "k".to_string(),
            secret_access_key: "s".to_string(),
            bucket_name: "enhanced".to_string(),
            region: "auto".to_string(),
            public_base_url: None,
        })
        .await
        .unwrap();

        let config = WorkerConfig {
            work_dir: work_dir.to_path_buf(),
            ..WorkerConfig::default()
        };
        VideoPipeline::new(config, storage).unwrap()
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_residue() {
        let dir = TempDir::new().unwrap();
        let pipeline = test_pipeline(dir.path()).await;

        // Nothing listens on port 9; download fails before any frame work
        let err = pipeline
            .enhance("http://127.0.0.1:9/video.mp4")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Media(facelift_media::MediaError::DownloadFailed { .. })
        ));

        // No job dir was ever created, no frame temp dirs
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

}
