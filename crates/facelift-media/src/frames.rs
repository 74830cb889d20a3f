//! Frame extraction, normalization, and temp-directory cleanup.
//!
//! Frames live on disk as a sequence of PNGs named `frame_000000.png`,
//! `frame_000001.png`, ... (6-digit zero-padded, starting at zero). The same
//! layout is used for extracted source frames and enhanced output frames, and
//! is what the mux step consumes.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::RgbImage;
use tracing::{debug, warn};

use crate::command::{run_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// FFmpeg pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// File name for the frame at `index`: `frame_000000.png` etc.
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{:06}.png", index)
}

/// Path of the frame at `index` inside `dir`.
pub fn frame_path(dir: impl AsRef<Path>, index: u64) -> PathBuf {
    dir.as_ref().join(frame_file_name(index))
}

/// Decode every frame of `video` into `dir` as a zero-based PNG sequence.
///
/// Returns the number of frames written. The directory is created when
/// missing; existing contents are not touched (callers pass a fresh dir).
pub async fn extract_frames(video: impl AsRef<Path>, dir: impl AsRef<Path>) -> MediaResult<u64> {
    let video = video.as_ref();
    let dir = dir.as_ref();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }
    tokio::fs::create_dir_all(dir).await?;

    let cmd = FfmpegCommand::new(dir.join(FRAME_PATTERN))
        .input(video, Vec::<String>::new())
        .output_args(["-start_number", "0"]);

    run_ffmpeg(&cmd).await?;

    let count = count_frames(dir).await?;
    debug!("Extracted {} frames from {}", count, video.display());
    Ok(count)
}

/// Count sequential frame files in `dir`, stopping at the first gap.
pub async fn count_frames(dir: impl AsRef<Path>) -> MediaResult<u64> {
    let dir = dir.as_ref();
    let mut index = 0u64;
    while frame_path(dir, index).exists() {
        index += 1;
    }
    Ok(index)
}

/// Resize `frame` to the container's declared geometry when it mismatches.
///
/// Frames whose raw shape already matches are returned untouched.
pub fn normalize_frame(frame: RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.width() == width && frame.height() == height {
        return frame;
    }
    image::imageops::resize(&frame, width, height, FilterType::Triangle)
}

/// Load a frame PNG from disk as RGB8.
pub fn load_frame(path: impl AsRef<Path>) -> MediaResult<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| MediaError::invalid_frame(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_rgb8())
}

/// Write a frame to disk as PNG.
pub fn save_frame(frame: &RgbImage, path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();
    frame
        .save(path)
        .map_err(|e| MediaError::invalid_frame(format!("{}: {}", path.display(), e)))
}

/// Remove a temp frame directory and everything in it.
///
/// Idempotent: a directory that is already gone is not an error. Individual
/// removal failures are logged and swallowed.
pub async fn cleanup_dir(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    if !dir.exists() {
        return;
    }
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!("Failed to remove temp dir {}: {}", dir.display(), e);
    }
}
