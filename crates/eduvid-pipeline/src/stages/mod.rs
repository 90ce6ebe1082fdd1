//! Generation stages.
//!
//! Every stage reads what it needs from the job's accumulated results,
//! writes its output into the job directory and returns the artifact path
//! to record under its artifact key.

mod captions;
mod narration;
mod planning;
mod video;

use std::path::{Path, PathBuf};

use eduvid_models::{JobId, JobResults, Scene, StageName};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::services::Services;

pub use captions::{subtitle_burn_in, subtitle_generation};
pub use narration::{audio_concatenation, audio_generation, scene_audio_path};
pub use planning::{code_generation, scene_breakdown};
pub use video::{finalize, rendering, sync};

/// Inputs available to a stage.
#[derive(Debug, Clone)]
pub struct StageContext<'a> {
    pub job_id: &'a JobId,
    pub description: &'a str,
    pub project_name: &'a str,
    pub add_subtitles: bool,
    /// Output folder for this job
    pub work_dir: &'a Path,
    /// Artifacts recorded by earlier stages
    pub results: &'a JobResults,
    pub config: &'a PipelineConfig,
    pub services: &'a Services,
}

impl StageContext<'_> {
    /// `<work_dir>/<project>_<suffix>`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}", self.project_name, suffix))
    }

    /// Artifact an earlier stage recorded, as a path.
    pub fn artifact(&self, stage: StageName, producer: StageName) -> PipelineResult<PathBuf> {
        let key = producer.artifact_key();
        self.results
            .get(key)
            .map(PathBuf::from)
            .ok_or(PipelineError::MissingArtifact { stage, key })
    }

    /// Scene list written by the scene breakdown stage.
    pub async fn scenes(&self, stage: StageName) -> PipelineResult<Vec<Scene>> {
        let path = self.artifact(stage, StageName::SceneBreakdown)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Run one stage and return its artifact.
pub async fn run(stage: StageName, ctx: &StageContext<'_>) -> PipelineResult<String> {
    let artifact = match stage {
        StageName::SceneBreakdown => scene_breakdown(ctx).await?,
        StageName::CodeGeneration => code_generation(ctx).await?,
        StageName::AudioGeneration => audio_generation(ctx).await?,
        StageName::AudioConcatenation => audio_concatenation(ctx).await?,
        StageName::SubtitleGeneration => subtitle_generation(ctx).await?,
        StageName::Rendering => rendering(ctx).await?,
        StageName::Sync => sync(ctx).await?,
        StageName::SubtitleBurnIn => subtitle_burn_in(ctx).await?,
        StageName::Finalize => finalize(ctx).await?,
    };
    Ok(artifact.to_string_lossy().to_string())
}
