//! Endpoint tests driven through the router with in-process collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use eduvid_ai_client::prompts::PLANNER_SYSTEM_PROMPT;
use eduvid_api::{create_router, ApiConfig, AppState};
use eduvid_models::{Job, JobId, JobStatus};
use eduvid_pipeline::{
    AnimationRenderer, JobStore, MediaProcessor, PipelineConfig, PipelineResult, PipelineRunner,
    Services, SpeechSynthesizer, TextGenerator,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const SCENES_JSON: &str = r#"[{"scene": 1, "duration": 4, "visual": "A circle", "narration": "This is a circle.", "key_concepts": []}]"#;
const MANIM_CODE: &str = "from manim import *\n\nclass EducationalScene(Scene):\n    def construct(self):\n        self.wait(4)\n";

async fn touch(path: &Path) -> PipelineResult<PathBuf> {
    tokio::fs::write(path, b"fake mp4 bytes").await?;
    Ok(path.to_path_buf())
}

struct FakeText;

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, system: &str, _prompt: &str) -> PipelineResult<String> {
        if system == PLANNER_SYSTEM_PROMPT {
            Ok(SCENES_JSON.to_string())
        } else {
            Ok(MANIM_CODE.to_string())
        }
    }
}

struct FakeSpeech;

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, _text: &str, output: &Path) -> PipelineResult<PathBuf> {
        touch(output).await
    }
}

struct FakeRenderer;

#[async_trait]
impl AnimationRenderer for FakeRenderer {
    async fn render(&self, _code_file: &Path, media_dir: &Path) -> PipelineResult<PathBuf> {
        tokio::fs::create_dir_all(media_dir).await?;
        touch(&media_dir.join("EducationalScene.mp4")).await
    }
}

struct FakeMedia;

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn duration(&self, _path: &Path) -> PipelineResult<f64> {
        Ok(4.0)
    }

    async fn concat_audio(&self, _list_file: &Path, output: &Path) -> PipelineResult<PathBuf> {
        touch(output).await
    }

    async fn sync(&self, _video: &Path, _audio: &Path, output: &Path) -> PipelineResult<PathBuf> {
        touch(output).await
    }

    async fn burn_subtitles(
        &self,
        _video: &Path,
        _srt: &Path,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        touch(output).await
    }

    async fn add_music(
        &self,
        _video: &Path,
        _music: &Path,
        _volume: f64,
        output: &Path,
    ) -> PipelineResult<PathBuf> {
        touch(output).await
    }
}

struct TestApp {
    router: Router,
    runner: PipelineRunner,
    _dir: TempDir,
}

fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        output_dir: dir.path().join("outputs"),
        ..Default::default()
    };
    let services = Services {
        text: Arc::new(FakeText),
        speech: Arc::new(FakeSpeech),
        renderer: Arc::new(FakeRenderer),
        media: Arc::new(FakeMedia),
    };
    let runner = PipelineRunner::new(Arc::new(JobStore::new()), services, config);
    let state = AppState::new(ApiConfig::default(), runner.clone());

    TestApp {
        router: create_router(state, None),
        runner,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn wait_terminal(runner: &PipelineRunner, id: &JobId) -> Job {
    for _ in 0..500 {
        if let Some(job) = runner.store().get(id).await {
            if job.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_ready_reports_tool_checks() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/ready").await;

    // Depends on the host; the body must agree with the status either way
    let ready = body["ready"].as_bool().unwrap();
    if ready {
        assert_eq!(status, StatusCode::OK);
    } else {
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
    for check in ["ffmpeg", "ffprobe", "renderer"] {
        assert!(body["checks"][check]["status"].is_string(), "missing {check}");
    }
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app();
    let request = Request::get("/health")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.router, request).await;

    assert_eq!(headers["X-Request-ID"], "req-123");
    assert_eq!(headers["X-Content-Type-Options"], "nosniff");
}

#[tokio::test]
async fn test_generate_accepts_and_completes() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/api/generate",
        r#"{"description": "Explain circles", "project_name": "circles"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = wait_terminal(&app.runner, &JobId::from_string(job_id.clone())).await;
    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);

    let (status, body) = get_json(&app.router, &format!("/api/status/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["project_name"], "circles");
    assert_eq!(body["download_url"], format!("/api/download/{job_id}"));
    assert!(body["results"]["final_video"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_generate_rejects_bad_bodies() {
    let app = test_app();

    let (status, body) = post_json(&app.router, "/api/generate", r#"{"description": "   "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    assert_eq!(body["detail"], body["error"]);

    let (status, _) = post_json(&app.router, "/api/generate", r#"{}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app.router, "/api/generate", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app.router,
        "/api/generate",
        r#"{"description": "x", "project_name": "../etc"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.runner.store().is_empty().await);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = test_app();

    let (status, body) = get_json(&app.router, "/api/status/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Job not found");

    let (status, _) = get_json(&app.router, "/api/download/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_not_ready() {
    let app = test_app();
    // Created but never submitted, so it stays queued
    let id = app.runner.store().create(Job::new("Explain circles", None)).await;

    let (status, body) = get_json(&app.router, &format!("/api/download/{id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Video not ready yet");
}

#[tokio::test]
async fn test_download_streams_final_video() {
    let app = test_app();
    let id = app
        .runner
        .submit(Job::new("Explain circles", Some("circles".to_string())))
        .await;
    let job = wait_terminal(&app.runner, &id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let request = Request::get(format!("/api/download/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"circles.mp4\""
    );
    assert_eq!(body, b"fake mp4 bytes");
}

#[tokio::test]
async fn test_download_missing_file_is_404() {
    let app = test_app();
    let id = app.runner.submit(Job::new("Explain circles", None)).await;
    let job = wait_terminal(&app.runner, &id).await;

    std::fs::remove_file(job.final_video().unwrap()).unwrap();

    let (status, _) = get_json(&app.router, &format!("/api/download/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_jobs() {
    let app = test_app();
    let store = app.runner.store();
    store.create(Job::new("first", Some("first".to_string()))).await;
    store.create(Job::new("second", Some("second".to_string()))).await;

    let (status, body) = get_json(&app.router, "/api/jobs").await;
    assert_eq!(status, StatusCode::OK);

    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j["status"] == "queued"));
    assert!(jobs.iter().any(|j| j["project_name"] == "second"));
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        output_dir: dir.path().join("outputs"),
        ..Default::default()
    };
    let services = Services {
        text: Arc::new(FakeText),
        speech: Arc::new(FakeSpeech),
        renderer: Arc::new(FakeRenderer),
        media: Arc::new(FakeMedia),
    };
    let runner = PipelineRunner::new(Arc::new(JobStore::new()), services, config);
    let api_config = ApiConfig {
        rate_limit_rps: 1,
        ..Default::default()
    };
    let router = create_router(AppState::new(api_config, runner), None);

    let request = || {
        Request::get("/api/jobs")
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    let (first, _, _) = send(&router, request()).await;
    let (second, _, _) = send(&router, request()).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);

    let (_, headers, _) = send(&router, request()).await;
    assert_eq!(headers.get("Retry-After").unwrap(), "1");

    // Other clients keep their own budget
    let other = Request::get("/api/jobs")
        .header("X-Forwarded-For", "198.51.100.4")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, other).await;
    assert_eq!(status, StatusCode::OK);

    // Only /api is limited
    for uri in ["/health", "/healthz", "/ready"] {
        let request = Request::get(uri)
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&router, request).await;
        assert_ne!(status, StatusCode::TOO_MANY_REQUESTS, "{uri}");
    }

    // No identifiable client IP means no bucket to charge
    let (anonymous, _) = get_json(&router, "/api/jobs").await;
    let (again, _) = get_json(&router, "/api/jobs").await;
    assert_eq!(anonymous, StatusCode::OK);
    assert_eq!(again, StatusCode::OK);
}
