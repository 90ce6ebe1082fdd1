//! Subtitle file generation and burn-in.

use std::path::PathBuf;

use eduvid_models::StageName;
use tracing::{info, warn};

use super::narration::scene_audio_path;
use super::StageContext;
use crate::error::PipelineResult;

/// Write an SRT file, one cue per scene.
///
/// Cues follow the measured narration lengths when every scene's audio can
/// be probed, so the text stays aligned with what is spoken. Otherwise the
/// planned scene durations are used.
pub async fn subtitle_generation(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let scenes = ctx.scenes(StageName::SubtitleGeneration).await?;

    let mut measured = Vec::with_capacity(scenes.len());
    for i in 0..scenes.len() {
        match ctx.services.media.duration(&scene_audio_path(ctx, i + 1)).await {
            Ok(d) => measured.push(d),
            Err(e) => {
                warn!(job_id = %ctx.job_id, "Using planned scene durations for subtitles: {}", e);
                measured.clear();
                break;
            }
        }
    }
    let durations = (measured.len() == scenes.len()).then_some(measured.as_slice());

    let path = ctx.output_path("subtitles.srt");
    Ok(eduvid_media::write_srt(&scenes, durations, &path).await?)
}

/// Burn subtitles into the synced video, or pass it through when disabled.
pub async fn subtitle_burn_in(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let stage = StageName::SubtitleBurnIn;
    let synced = ctx.artifact(stage, StageName::Sync)?;

    if !ctx.add_subtitles {
        info!(job_id = %ctx.job_id, "Subtitles disabled, keeping synced video");
        return Ok(synced);
    }

    let srt = ctx.artifact(stage, StageName::SubtitleGeneration)?;
    let output = ctx.output_path("subtitled.mp4");
    ctx.services.media.burn_subtitles(&synced, &srt, &output).await
}
