//! Fit a rendered animation to the narration track.
//!
//! The narration length is authoritative. Animations that are a bit off
//! get retimed with `setpts`; animations far shorter than the narration
//! are looped and trimmed instead, since a large slow-down looks broken.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// Slow-down factor above which looping replaces retiming.
pub const MAX_STRETCH: f64 = 3.0;

/// How to fit a video of one length to audio of another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncPlan {
    /// Multiply presentation timestamps by `factor` (>1 slows down).
    Stretch { factor: f64 },
    /// Repeat the video `loops` extra times and cut at `duration` seconds.
    Loop { loops: u32, duration: f64 },
}

impl SyncPlan {
    /// Pick a plan from measured durations in seconds.
    pub fn from_durations(audio: f64, video: f64) -> MediaResult<Self> {
        if !(audio.is_finite() && audio > 0.0) {
            return Err(MediaError::invalid_media(format!("bad audio duration {audio}")));
        }
        if !(video.is_finite() && video > 0.0) {
            return Err(MediaError::invalid_media(format!("bad video duration {video}")));
        }

        let factor = audio / video;
        if factor > MAX_STRETCH {
            Ok(SyncPlan::Loop {
                loops: (factor as u32).saturating_add(1),
                duration: audio,
            })
        } else {
            Ok(SyncPlan::Stretch { factor })
        }
    }

    /// Whether the adjustment is large enough to be worth a warning.
    pub fn is_drastic(&self) -> bool {
        match self {
            SyncPlan::Stretch { factor } => *factor > 2.0 || *factor < 0.5,
            SyncPlan::Loop { .. } => true,
        }
    }
}

/// Mux `video` with `audio`, retiming or looping the video to fit.
pub async fn sync_video_and_audio(
    runner: &FfmpegRunner,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> MediaResult<PathBuf> {
    let audio_duration = probe_duration(audio).await?;
    let video_duration = probe_duration(video).await?;
    let plan = SyncPlan::from_durations(audio_duration, video_duration)?;

    info!(
        audio_duration,
        video_duration,
        ?plan,
        "Syncing animation with narration"
    );
    if plan.is_drastic() {
        warn!(?plan, "Large timing adjustment needed to match narration");
    }

    match plan {
        SyncPlan::Stretch { factor } => {
            let cmd = stretch_command(video, audio, output, factor);
            runner.run(&cmd).await?;
        }
        SyncPlan::Loop { loops, duration } => {
            let looped = output.with_file_name(format!(
                "{}_looped.mp4",
                output
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "video".to_string())
            ));

            let loop_cmd = FfmpegCommand::new(video, &looped)
                .input_args(["-stream_loop".to_string(), loops.to_string()])
                .output_duration(duration)
                .video_codec("libx264");
            runner.run(&loop_cmd).await?;

            let mux_cmd = FfmpegCommand::new(&looped, output)
                .add_input(audio)
                .video_codec("copy")
                .audio_codec("aac")
                .shortest();
            let result = runner.run(&mux_cmd).await;

            if let Err(e) = tokio::fs::remove_file(&looped).await {
                warn!("Failed to remove {}: {}", looped.display(), e);
            }
            result?;
        }
    }

    Ok(output.to_path_buf())
}

fn stretch_command(video: &Path, audio: &Path, output: &Path, factor: f64) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .add_input(audio)
        .filter_complex(format!("[0:v]setpts={:.6}*PTS[v]", factor))
        .map("[v]")
        .map("1:a")
        .video_codec("libx264")
        .audio_codec("aac")
        .shortest()
}
