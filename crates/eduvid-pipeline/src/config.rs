//! Pipeline configuration.

use std::path::PathBuf;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for per-job output folders
    pub output_dir: PathBuf,
    /// Maximum jobs running at once; further jobs stay queued
    pub max_concurrent_jobs: usize,
    /// Timeout for each FFmpeg/Manim subprocess
    pub stage_timeout_secs: Option<u64>,
    /// Render inside this Docker image instead of the host `manim`
    pub manim_docker_image: Option<String>,
    /// Music mixed under the narration during finalize
    pub background_music_path: Option<PathBuf>,
    /// Music volume (0.0 to 1.0)
    pub background_music_volume: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            max_concurrent_jobs: 2,
            stage_timeout_secs: None,
            manim_docker_image: None,
            background_music_path: None,
            background_music_volume: 0.1,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("outputs")),
            max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            stage_timeout_secs: std::env::var("STAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            manim_docker_image: std::env::var("MANIM_DOCKER_IMAGE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            background_music_path: std::env::var("BACKGROUND_MUSIC_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            background_music_volume: std::env::var("BACKGROUND_MUSIC_VOLUME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        }
    }

    /// Output folder for one job.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(job_id)
    }
}
