//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
///
/// FFmpeg argument order matters: per-input arguments go before their `-i`,
/// output arguments go after all inputs. The builder keeps the two lists
/// separate so callers cannot get this wrong.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input specs, each a list of args followed by `-i <path>`
    inputs: Vec<InputSpec>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

#[derive(Debug, Clone)]
struct InputSpec {
    args: Vec<String>,
    path: PathBuf,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input file with its per-input arguments (placed before `-i`).
    pub fn input<I, S>(mut self, path: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(InputSpec {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an output argument (after all inputs).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.clone());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Run an FFmpeg command to completion.
///
/// The exit status is always checked; a nonzero exit becomes
/// `MediaError::FfmpegFailed` carrying the captured stderr.
pub async fn run_ffmpeg(cmd: &FfmpegCommand) -> MediaResult<()> {
    // Check FFmpeg exists
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let args = cmd.build_args();
    debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

    let output = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if output.status.success() {
        Ok(())
    } else {
        Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ))
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_single_input() {
        let cmd = FfmpegCommand::new("output.mp4")
            .input("input.mp4", Vec::<String>::new())
            .video_codec("libx264")
            .audio_codec("aac")
            .audio_bitrate("128k");

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"128k".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_command_builder_input_args_precede_path() {
        let cmd = FfmpegCommand::new("out.mp4").input("frames/frame_%06d.png", ["-r", "30"]);

        let args = cmd.build_args();
        let r_pos = args.iter().position(|a| a == "-r").unwrap();
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(r_pos < i_pos, "per-input args must come before -i");
    }

    #[test]
    fn test_command_builder_multiple_inputs_ordered() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input("frames/frame_%06d.png", ["-r", "30"])
            .input("audio_src.mp4", Vec::<String>::new())
            .output_arg("-shortest");

        let args = cmd.build_args();
        let first_i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[first_i + 1], "frames/frame_%06d.png");
        let second_i = args.iter().rposition(|a| a == "-i").unwrap();
        assert_eq!(args[second_i + 1], "audio_src.mp4");
        let shortest = args.iter().position(|a| a == "-shortest").unwrap();
        assert!(shortest > second_i, "output args must follow all inputs");
    }
}
