//! SRT generation and subtitle burn-in.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use eduvid_models::Scene;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// libass style applied when burning subtitles.
pub const SUBTITLE_STYLE: &str =
    "FontSize=24,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,Outline=2";

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Build SRT text with one cue per scene, timed by cumulative durations.
///
/// `durations` overrides the planned scene durations when the measured
/// narration lengths are known; missing entries fall back to the plan.
pub fn build_srt(scenes: &[Scene], durations: Option<&[f64]>) -> String {
    let mut srt = String::new();
    let mut start = 0.0;

    for (i, scene) in scenes.iter().enumerate() {
        let duration = durations
            .and_then(|d| d.get(i).copied())
            .unwrap_or(scene.duration)
            .max(0.0);
        let end = start + duration;

        let _ = write!(
            srt,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(start),
            format_srt_time(end),
            scene.narration.trim()
        );

        start = end;
    }

    srt
}

/// Write an SRT file for the given scenes.
pub async fn write_srt(
    scenes: &[Scene],
    durations: Option<&[f64]>,
    output: &Path,
) -> MediaResult<PathBuf> {
    if scenes.is_empty() {
        return Err(MediaError::invalid_media("no scenes to subtitle"));
    }
    tokio::fs::write(output, build_srt(scenes, durations)).await?;
    Ok(output.to_path_buf())
}

/// Escape a path for use inside an FFmpeg filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', r"\:")
        .replace('\'', r"\'")
}

/// Build the `subtitles=` filter expression.
pub fn subtitles_filter(srt: &Path) -> String {
    format!(
        "subtitles={}:force_style='{}'",
        escape_filter_path(srt),
        SUBTITLE_STYLE
    )
}

/// Burn an SRT file into a video, copying the audio stream.
pub async fn burn_subtitles(
    runner: &FfmpegRunner,
    video: &Path,
    srt: &Path,
    output: &Path,
) -> MediaResult<PathBuf> {
    for path in [video, srt] {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
    }

    info!("Burning subtitles into {}", video.display());

    let cmd = FfmpegCommand::new(video, output)
        .video_filter(subtitles_filter(srt))
        .audio_codec("copy");
    runner.run(&cmd).await?;

    Ok(output.to_path_buf())
}
