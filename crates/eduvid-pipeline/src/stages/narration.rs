//! Narration synthesis and concatenation.

use std::path::PathBuf;

use eduvid_models::StageName;
use tracing::debug;

use super::StageContext;
use crate::error::{PipelineError, PipelineResult};

/// Where the narration for scene `n` (1-based) is written.
pub fn scene_audio_path(ctx: &StageContext<'_>, n: usize) -> PathBuf {
    ctx.output_path(&format!("scene_{n}_audio.mp3"))
}

/// Synthesize one audio file per scene. The artifact is the concat list.
pub async fn audio_generation(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let stage = StageName::AudioGeneration;
    let scenes = ctx.scenes(stage).await?;

    let mut files = Vec::with_capacity(scenes.len());
    for (i, scene) in scenes.iter().enumerate() {
        let output = scene_audio_path(ctx, i + 1);
        debug!(job_id = %ctx.job_id, scene = scene.scene, "Synthesizing narration");
        let written = ctx
            .services
            .speech
            .synthesize(&scene.narration, &output)
            .await?;
        files.push(written);
    }

    if files.is_empty() {
        return Err(PipelineError::stage_failed(stage, "no scenes to narrate"));
    }

    let list = ctx.output_path("audio_list.txt");
    eduvid_media::write_concat_list(&files, &list).await?;
    Ok(list)
}

/// Join the per-scene narration into one track.
pub async fn audio_concatenation(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let list = ctx.artifact(StageName::AudioConcatenation, StageName::AudioGeneration)?;
    let output = ctx.output_path("audio.mp3");
    ctx.services.media.concat_audio(&list, &output).await
}
