//! Output video assembly: frames + source audio into one container.
//!
//! The codec contract is fixed for player compatibility: H.264 baseline
//! profile level 3.0, yuv420p, AAC audio at 128 kbps, faststart metadata,
//! frame rate equal to the source's detected rate.

use std::path::Path;

use crate::command::FfmpegCommand;
use crate::frames::FRAME_PATTERN;

/// Build the mux command combining the PNG sequence in `frames_dir` with the
/// audio track of `audio_source`.
///
/// `thread_queue_size` is an informational hint sized from the host's core
/// count; it does not parallelize frame work.
pub fn mux_frames_command(
    frames_dir: impl AsRef<Path>,
    fps: f64,
    audio_source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    thread_queue_size: usize,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(
            frames_dir.as_ref().join(FRAME_PATTERN),
            [
                "-thread_queue_size".to_string(),
                thread_queue_size.to_string(),
                "-start_number".to_string(),
                "0".to_string(),
                "-r".to_string(),
                format_fps(fps),
            ],
        )
        .input(audio_source, Vec::<String>::new())
        // First input supplies video, second supplies audio; audio is
        // optional so a silent source still encodes.
        .output_args(["-map", "0:v:0", "-map", "1:a:0?"])
        .video_codec("libx264")
        .output_args(["-pix_fmt", "yuv420p"])
        .output_args(["-profile:v", "baseline"])
        .output_args(["-level", "3.0"])
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_args(["-movflags", "+faststart"])
        .output_args(["-shortest"])
}

/// Render fps for the command line, dropping a trailing `.0` for integral
/// rates so `-r 30` stays `30`, not `30.0`.
fn format_fps(fps: f64) -> String {
    if (fps - fps.round()).abs() < 1e-9 {
        format!("{}", fps.round() as u64)
    } else {
        format!("{:.3}", fps)
    }
}

/// Thread queue hint derived from available cores.
pub fn default_thread_queue_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(fps: f64) -> Vec<String> {
        mux_frames_command("frames", fps, "input_video.mp4", "out.mp4", 8).build_args()
    }

    #[test]
    fn test_mux_codec_contract() {
        let args = args_for(30.0);
        let joined = args.join(" ");

        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert!(joined.contains("-profile:v baseline"));
        assert!(joined.contains("-level 3.0"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:a 128k"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.contains("-start_number 0"));
        assert!(joined.contains("-thread_queue_size 8"));
    }

    #[test]
    fn test_mux_uses_source_frame_rate() {
        let args = args_for(30.0);
        let r_pos = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r_pos + 1], "30");

        let args = args_for(29.97);
        let r_pos = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r_pos + 1], "29.970");
    }

    #[test]
    fn test_mux_frame_pattern_input() {
        let args = args_for(24.0);
        assert!(args
            .iter()
            .any(|a| a.ends_with("frame_%06d.png")), "frames input must use the 6-digit pattern");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }
}
