//! External collaborators used by the stages.
//!
//! Each collaborator is a trait so the runner can be driven by in-process
//! fakes. The real implementations wrap the AI client and the media crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use eduvid_ai_client::AiClient;
use eduvid_media::{FfmpegRunner, ManimRenderer};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;

/// Language model returning generated text or code.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> PipelineResult<String>;
}

/// Text-to-speech writing one audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> PipelineResult<PathBuf>;
}

/// Animation renderer turning a code file into a video.
#[async_trait]
pub trait AnimationRenderer: Send + Sync {
    async fn render(&self, code_file: &Path, media_dir: &Path) -> PipelineResult<PathBuf>;
}

/// Media tool operations the stages need.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Duration of a media file in seconds.
    async fn duration(&self, path: &Path) -> PipelineResult<f64>;

    /// Join the files in a concat list.
    async fn concat_audio(&self, list_file: &Path, output: &Path) -> PipelineResult<PathBuf>;

    /// Fit `video` to `audio` and mux them.
    async fn sync(&self, video: &Path, audio: &Path, output: &Path) -> PipelineResult<PathBuf>;

    async fn burn_subtitles(&self, video: &Path, srt: &Path, output: &Path)
        -> PipelineResult<PathBuf>;

    async fn add_music(
        &self,
        video: &Path,
        music: &Path,
        volume: f64,
        output: &Path,
    ) -> PipelineResult<PathBuf>;
}

#[async_trait]
impl TextGenerator for AiClient {
    async fn generate(&self, system: &str, prompt: &str) -> PipelineResult<String> {
        Ok(self.chat(system, prompt).await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for AiClient {
    async fn synthesize(&self, text: &str, output: &Path) -> PipelineResult<PathBuf> {
        Ok(self.speech(text, output).await?)
    }
}

/// Manim on the host or inside a Docker image.
#[derive(Debug, Clone, Default)]
pub struct ManimAnimation {
    docker_image: Option<String>,
    timeout_secs: Option<u64>,
}

impl ManimAnimation {
    pub fn new(docker_image: Option<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            docker_image,
            timeout_secs,
        }
    }
}

#[async_trait]
impl AnimationRenderer for ManimAnimation {
    async fn render(&self, code_file: &Path, media_dir: &Path) -> PipelineResult<PathBuf> {
        let renderer = ManimRenderer::new(media_dir)
            .with_docker_image(self.docker_image.clone())
            .with_timeout(self.timeout_secs);
        Ok(renderer.render(code_file).await?)
    }
}

/// FFmpeg/FFprobe backed media processing.
#[derive(Debug, Clone, Default)]
pub struct FfmpegMedia {
    runner: FfmpegRunner,
}

impl FfmpegMedia {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self {
            runner: FfmpegRunner::new().with_optional_timeout(timeout_secs),
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegMedia {
    async fn duration(&self, path: &Path) -> PipelineResult<f64> {
        Ok(eduvid_media::probe_duration(path).await?)
    }

    async fn concat_audio(&self, list_file: &Path, output: &Path) -> PipelineResult<PathBuf> {
        Ok(eduvid_media::concat_audio_list(&self.runner, list_file, output).await?)
    }

    async fn sync(&self, video: &Path, audio: &Path, output: &Path) -> PipelineResult<PathBuf> {
        Ok(eduvid_media::sync_video_and_audio(&self.runner, video, audio, output).await?)
    }

    async fn burn_subtitles(
        &self,
        video: &Path,
        srt: &Path,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        Ok(eduvid_media::burn_subtitles(&self.runner, video, srt, output).await?)
    }

    async fn add_music(
        &self,
        video: &Path,
        music: &Path,
        volume: f64,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        Ok(eduvid_media::add_background_music(&self.runner, video, music, volume, output).await?)
    }
}

/// The set of collaborators a pipeline run uses.
#[derive(Clone)]
pub struct Services {
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub renderer: Arc<dyn AnimationRenderer>,
    pub media: Arc<dyn MediaProcessor>,
}

impl Services {
    /// Real collaborators: the AI client for text and speech, Manim and FFmpeg for media.
    pub fn from_config(config: &PipelineConfig, ai: AiClient) -> Self {
        let ai = Arc::new(ai);
        Self {
            text: ai.clone(),
            speech: ai,
            renderer: Arc::new(ManimAnimation::new(
                config.manim_docker_image.clone(),
                config.stage_timeout_secs,
            )),
            media: Arc::new(FfmpegMedia::new(config.stage_timeout_secs)),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
