//! Pipeline runner tests with in-process collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eduvid_ai_client::prompts::{MANIM_SYSTEM_PROMPT, PLANNER_SYSTEM_PROMPT};
use eduvid_models::{Job, JobId, JobStatus, StageName};
use eduvid_pipeline::{
    AnimationRenderer, JobStore, MediaProcessor, PipelineConfig, PipelineError, PipelineResult,
    PipelineRunner, Services, SpeechSynthesizer, TextGenerator,
};
use tempfile::TempDir;
use tokio::sync::Semaphore;

const SCENES_JSON: &str = r#"```json
[
  {"scene": 1, "duration": 6, "visual": "A right triangle", "narration": "Meet the right triangle.", "key_concepts": ["hypotenuse"]},
  {"scene": 2, "duration": 8, "visual": "Squares on each side", "narration": "The squares add up.", "key_concepts": []}
]
```"#;

const MANIM_CODE: &str = "```python\nfrom manim import *\n\nclass EducationalScene(Scene):\n    def construct(self):\n        self.wait(14)\n```";

type CallLog = Arc<Mutex<Vec<String>>>;

fn log(calls: &CallLog, entry: impl Into<String>) {
    calls.lock().unwrap().push(entry.into());
}

async fn touch(path: &Path) -> PipelineResult<PathBuf> {
    tokio::fs::write(path, b"media").await?;
    Ok(path.to_path_buf())
}

struct FakeText {
    scenes: String,
    code: String,
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, system: &str, _prompt: &str) -> PipelineResult<String> {
        if system == PLANNER_SYSTEM_PROMPT {
            Ok(self.scenes.clone())
        } else if system == MANIM_SYSTEM_PROMPT {
            Ok(self.code.clone())
        } else {
            panic!("unexpected system prompt: {system}");
        }
    }
}

struct FakeSpeech {
    calls: CallLog,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str, output: &Path) -> PipelineResult<PathBuf> {
        log(&self.calls, format!("speech:{text}"));
        touch(output).await
    }
}

struct FakeRenderer {
    calls: CallLog,
    fail_with: Option<String>,
    panic_with: Option<String>,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl AnimationRenderer for FakeRenderer {
    async fn render(&self, code_file: &Path, media_dir: &Path) -> PipelineResult<PathBuf> {
        log(&self.calls, "render");
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(msg) = &self.panic_with {
            panic!("{msg}");
        }
        if let Some(msg) = &self.fail_with {
            return Err(PipelineError::Media(eduvid_media::MediaError::render_failed(
                msg.clone(),
                None,
            )));
        }
        assert!(code_file.exists());
        tokio::fs::create_dir_all(media_dir).await?;
        touch(&media_dir.join("EducationalScene.mp4")).await
    }
}

struct FakeMedia {
    calls: CallLog,
}

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn duration(&self, _path: &Path) -> PipelineResult<f64> {
        Ok(5.0)
    }

    async fn concat_audio(&self, list_file: &Path, output: &Path) -> PipelineResult<PathBuf> {
        assert!(list_file.exists());
        log(&self.calls, "concat");
        touch(output).await
    }

    async fn sync(&self, video: &Path, audio: &Path, output: &Path) -> PipelineResult<PathBuf> {
        assert!(video.exists() && audio.exists());
        log(&self.calls, "sync");
        touch(output).await
    }

    async fn burn_subtitles(
        &self,
        _video: &Path,
        srt: &Path,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        assert!(srt.exists());
        log(&self.calls, "burn");
        touch(output).await
    }

    async fn add_music(
        &self,
        _video: &Path,
        _music: &Path,
        volume: f64,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        log(&self.calls, format!("music:{volume}"));
        touch(output).await
    }
}

struct Harness {
    runner: PipelineRunner,
    calls: CallLog,
    _dir: TempDir,
}

struct Options {
    scenes: String,
    render_error: Option<String>,
    render_panic: Option<String>,
    gate: Option<Arc<Semaphore>>,
    max_jobs: usize,
    music: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scenes: SCENES_JSON.to_string(),
            render_error: None,
            render_panic: None,
            gate: None,
            max_jobs: 2,
            music: false,
        }
    }
}

fn harness(opts: Options) -> Harness {
    let dir = TempDir::new().unwrap();
    let calls: CallLog = Arc::default();

    let music = dir.path().join("music.mp3");
    if opts.music {
        std::fs::write(&music, b"music").unwrap();
    }

    let config = PipelineConfig {
        output_dir: dir.path().join("outputs"),
        max_concurrent_jobs: opts.max_jobs,
        background_music_path: opts.music.then_some(music),
        background_music_volume: 0.2,
        ..Default::default()
    };

    let services = Services {
        text: Arc::new(FakeText {
            scenes: opts.scenes,
            code: MANIM_CODE.to_string(),
        }),
        speech: Arc::new(FakeSpeech {
            calls: calls.clone(),
        }),
        renderer: Arc::new(FakeRenderer {
            calls: calls.clone(),
            fail_with: opts.render_error,
            panic_with: opts.render_panic,
            gate: opts.gate,
        }),
        media: Arc::new(FakeMedia {
            calls: calls.clone(),
        }),
    };

    Harness {
        runner: PipelineRunner::new(Arc::new(JobStore::new()), services, config),
        calls,
        _dir: dir,
    }
}

impl Harness {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn run(&self, job: Job) -> Job {
        let id = self.runner.store().create(job).await;
        self.runner.execute(&id).await.unwrap()
    }

    async fn wait_for(&self, id: &JobId, pred: impl Fn(&Job) -> bool) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = self.runner.store().get(id).await.unwrap();
                if pred(&job) {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not reach expected state")
    }
}

#[tokio::test]
async fn test_job_completes_with_all_artifacts() {
    let h = harness(Options::default());
    let job = h.run(Job::new("Explain Pythagoras", Some("pythagoras".into()))).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    assert!(job.current_stage.is_none());
    for stage in StageName::ALL {
        assert!(
            job.results.contains_key(stage.artifact_key()),
            "missing {}",
            stage.artifact_key()
        );
    }

    let final_video = PathBuf::from(job.final_video().unwrap());
    assert!(final_video.exists());
    assert!(final_video.ends_with("pythagoras_final.mp4"));

    let scenes_file = PathBuf::from(&job.results["scenes"]);
    let code = std::fs::read_to_string(&job.results["manim_code"]).unwrap();
    assert!(scenes_file.ends_with("pythagoras_scenes.json"));
    assert!(code.starts_with("from manim import *"));

    let srt = std::fs::read_to_string(&job.results["subtitles"]).unwrap();
    assert!(srt.contains("00:00:05,000 --> 00:00:10,000"));

    assert_eq!(
        h.calls(),
        vec![
            "speech:Meet the right triangle.",
            "speech:The squares add up.",
            "concat",
            "render",
            "sync",
            "burn",
        ]
    );
}

#[tokio::test]
async fn test_stage_failure_stops_later_stages() {
    let h = harness(Options {
        render_error: Some("render error".into()),
        ..Default::default()
    });
    let job = h.run(Job::new("Explain gravity", None)).await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.as_deref().unwrap();
    assert!(error.contains("rendering failed"), "{error}");
    assert!(error.contains("render error"), "{error}");
    assert_eq!(job.current_stage, Some(StageName::Rendering));

    assert!(job.results.contains_key("subtitles"));
    assert!(!job.results.contains_key("animation"));
    assert!(!job.results.contains_key("synced_video"));
    assert!(job.final_video().is_none());

    let calls = h.calls();
    assert!(!calls.contains(&"sync".to_string()));
    assert!(!calls.contains(&"burn".to_string()));
}

#[tokio::test]
async fn test_unparseable_plan_fails_first_stage() {
    let h = harness(Options {
        scenes: "Sorry, I can't help with that.".into(),
        ..Default::default()
    });
    let job = h.run(Job::new("???", None)).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().starts_with("scene_breakdown failed"));
    assert!(job.results.is_empty());
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_subtitles_disabled_passes_synced_video_through() {
    let h = harness(Options::default());
    let job = h
        .run(Job::new("Explain tides", Some("tides".into())).with_subtitles(false))
        .await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results["subtitled_video"], job.results["synced_video"]);
    assert!(!h.calls().contains(&"burn".to_string()));
}

#[tokio::test]
async fn test_background_music_is_mixed_in_finalize() {
    let h = harness(Options {
        music: true,
        ..Default::default()
    });
    let job = h.run(Job::new("Explain sound", None)).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(h.calls().last().map(String::as_str), Some("music:0.2"));
}

#[tokio::test]
async fn test_finished_job_cannot_be_rerun() {
    let h = harness(Options::default());
    let job = h.run(Job::new("Explain light", None)).await;

    let err = h.runner.execute(&job.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Transition(_)));
    assert_eq!(
        h.runner.store().get(&job.id).await.unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_submit_runs_in_background() {
    let h = harness(Options::default());
    let id = h.runner.submit(Job::new("Explain magnets", None)).await;

    let job = h.wait_for(&id, Job::is_terminal).await;
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_panicking_stage_fails_submitted_job() {
    let h = harness(Options {
        render_panic: Some("renderer blew up".into()),
        ..Default::default()
    });
    let id = h.runner.submit(Job::new("Explain friction", None)).await;

    let job = h.wait_for(&id, Job::is_terminal).await;
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.as_deref().unwrap();
    assert!(error.contains("panicked"), "{error}");
    assert_eq!(job.current_stage, Some(StageName::Rendering));
    assert!(job.final_video().is_none());

    // The job slot is released for the next submission
    let next_id = h.runner.submit(Job::new("Explain inertia", None)).await;
    let next = h.wait_for(&next_id, Job::is_terminal).await;
    assert_eq!(next.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_jobs_over_the_cap_stay_queued() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(Options {
        gate: Some(gate.clone()),
        max_jobs: 1,
        ..Default::default()
    });

    let first = h.runner.submit(Job::new("first", None)).await;
    let second = h.runner.submit(Job::new("second", None)).await;

    h.wait_for(&first, |j| j.current_stage == Some(StageName::Rendering))
        .await;
    let waiting = h.runner.store().get(&second).await.unwrap();
    assert_eq!(waiting.status, JobStatus::Queued);

    gate.add_permits(2);
    h.wait_for(&first, Job::is_terminal).await;
    let second = h.wait_for(&second, Job::is_terminal).await;
    assert_eq!(second.status, JobStatus::Completed);
}
