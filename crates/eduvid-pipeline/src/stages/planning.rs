//! Scene planning and animation code generation.

use std::path::PathBuf;

use eduvid_ai_client::prompts::{
    extract_code_block, manim_code_prompt, parse_scenes, scene_breakdown_prompt,
    MANIM_SYSTEM_PROMPT, PLANNER_SYSTEM_PROMPT,
};
use eduvid_media::SCENE_CLASS;
use eduvid_models::{Scene, StageName};
use tracing::info;

use super::StageContext;
use crate::error::{PipelineError, PipelineResult};

/// Ask the language model for a timed scene list and save it as JSON.
pub async fn scene_breakdown(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let stage = StageName::SceneBreakdown;

    let response = ctx
        .services
        .text
        .generate(PLANNER_SYSTEM_PROMPT, &scene_breakdown_prompt(ctx.description))
        .await?;
    let scenes = parse_scenes(&response).map_err(|e| PipelineError::stage_failed(stage, e.to_string()))?;

    info!(
        job_id = %ctx.job_id,
        scenes = scenes.len(),
        total_secs = Scene::total_duration(&scenes),
        "Planned scenes"
    );

    let path = ctx.output_path("scenes.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(&scenes)?).await?;
    Ok(path)
}

/// Generate Manim code for the planned scenes.
pub async fn code_generation(ctx: &StageContext<'_>) -> PipelineResult<PathBuf> {
    let stage = StageName::CodeGeneration;
    let scenes = ctx.scenes(stage).await?;

    let prompt = manim_code_prompt(&scenes, SCENE_CLASS)?;
    let response = ctx
        .services
        .text
        .generate(MANIM_SYSTEM_PROMPT, &prompt)
        .await?;
    let code = extract_code_block(&response);

    if !code.contains(&format!("class {SCENE_CLASS}")) {
        return Err(PipelineError::stage_failed(
            stage,
            format!("generated code does not define {SCENE_CLASS}"),
        ));
    }

    let path = ctx.output_path("manim.py");
    tokio::fs::write(&path, code).await?;
    Ok(path)
}
