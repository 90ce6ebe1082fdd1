//! Rendering, sync and the final deliverable.

use std::path::PathBuf;

use eduvid_models::StageName;
use tracing::{info, warn};

use super::StageContext;
use crate::error::PipelineResult;

/// Render the generated Manim code.
pub async fn rendering(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let code = ctx.artifact(StageName::Rendering, StageName::CodeGeneration)?;
    let media_dir = ctx.work_dir.join("manim_media");
    ctx.services.renderer.render(&code, &media_dir).await
}

/// Fit the animation to the narration track.
pub async fn sync(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let stage = StageName::Sync;
    let animation = ctx.artifact(stage, StageName::Rendering)?;
    let audio = ctx.artifact(stage, StageName::AudioConcatenation)?;
    let output = ctx.output_path("synced.mp4");
    ctx.services.media.sync(&animation, &audio, &output).await
}

/// Produce `<project>_final.mp4`, mixing in background music when configured.
pub async fn finalize(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let source = ctx.artifact(StageName::Finalize, StageName::SubtitleBurnIn)?;
    let output = ctx.output_path("final.mp4");

    if let Some(music) = &ctx.config.background_music_path {
        if music.exists() {
            info!(job_id = %ctx.job_id, "Adding background music");
            return ctx
                .services
                .media
                .add_music(&source, music, ctx.config.background_music_volume, &output)
                .await;
        }
        warn!(
            job_id = %ctx.job_id,
            "Background music {} not found, skipping",
            music.display()
        );
    }

    tokio::fs::copy(&source, &output).await?;
    Ok(output)
}
