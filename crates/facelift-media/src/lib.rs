#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for the Facelift worker.
//!
//! This crate provides:
//! - HTTP download of source videos to local disk
//! - Container probing via ffprobe (geometry, fps, frame count, audio)
//! - Frame extraction to zero-padded PNG sequences and frame normalization
//! - Type-safe FFmpeg command building with checked exit status
//! - The frames+audio mux command used to assemble the output video

pub mod command;
pub mod download;
pub mod encode;
pub mod error;
pub mod frames;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, run_ffmpeg, FfmpegCommand};
pub use download::download_file;
pub use encode::mux_frames_command;
pub use error::{MediaError, MediaResult};
pub use frames::{cleanup_dir, extract_frames, frame_file_name, normalize_frame};
pub use probe::{probe_video, VideoInfo};
