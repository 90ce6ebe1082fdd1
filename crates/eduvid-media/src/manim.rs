//! Manim rendering, on the host or inside a container.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Scene class the generated code must define.
pub const SCENE_CLASS: &str = "EducationalScene";

/// Directory Manim writes `-qh` renders into.
const QUALITY_DIR: &str = "1080p60";

/// Maximum bytes of stderr carried into an error.
const STDERR_LIMIT: usize = 4000;

/// Check if the `manim` CLI is available.
pub fn check_manim() -> MediaResult<PathBuf> {
    which::which("manim").map_err(|_| MediaError::ToolNotFound("manim".to_string()))
}

/// Check if the `docker` CLI is available.
pub fn check_docker() -> MediaResult<PathBuf> {
    which::which("docker").map_err(|_| MediaError::ToolNotFound("docker".to_string()))
}

/// Renders generated Manim code into an mp4.
#[derive(Debug, Clone)]
pub struct ManimRenderer {
    /// Where Manim writes its media tree
    media_dir: PathBuf,
    /// Render inside this image instead of the host `manim`
    docker_image: Option<String>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl ManimRenderer {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            docker_image: None,
            timeout_secs: None,
        }
    }

    pub fn with_docker_image(mut self, image: Option<String>) -> Self {
        self.docker_image = image.filter(|i| !i.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Path Manim writes the rendered scene to for `code_file`.
    pub fn expected_output(&self, code_file: &Path) -> PathBuf {
        let stem = code_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.media_dir
            .join("videos")
            .join(stem)
            .join(QUALITY_DIR)
            .join(format!("{SCENE_CLASS}.mp4"))
    }

    /// Arguments passed to `manim` itself.
    fn manim_args(media_dir: &str, code_file: &str) -> Vec<String> {
        vec![
            "-qh".to_string(),
            "--format=mp4".to_string(),
            "--disable_caching".to_string(),
            "--media_dir".to_string(),
            media_dir.to_string(),
            code_file.to_string(),
            SCENE_CLASS.to_string(),
        ]
    }

    /// Program and arguments for a render of `code_file`.
    ///
    /// In container mode the code file's directory is mounted at `/manim`,
    /// so the media directory must live under it.
    pub fn build_command(&self, code_file: &Path) -> MediaResult<(String, Vec<String>)> {
        match &self.docker_image {
            None => Ok((
                "manim".to_string(),
                Self::manim_args(&self.media_dir.to_string_lossy(), &code_file.to_string_lossy()),
            )),
            Some(image) => {
                let work_dir = code_file
                    .parent()
                    .ok_or_else(|| MediaError::invalid_media("code file has no parent directory"))?;
                let media_rel = self.media_dir.strip_prefix(work_dir).map_err(|_| {
                    MediaError::invalid_media(format!(
                        "media dir {} is not under {}",
                        self.media_dir.display(),
                        work_dir.display()
                    ))
                })?;
                let file_name = code_file
                    .file_name()
                    .ok_or_else(|| MediaError::invalid_media("code file has no name"))?;

                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-v".to_string(),
                    format!("{}:/manim", work_dir.to_string_lossy()),
                    "-w".to_string(),
                    "/manim".to_string(),
                    image.clone(),
                    "manim".to_string(),
                ];
                // Container paths always use forward slashes
                let media_rel = media_rel.to_string_lossy().replace('\\', "/");
                args.extend(Self::manim_args(&media_rel, &file_name.to_string_lossy()));
                Ok(("docker".to_string(), args))
            }
        }
    }

    /// Render `code_file` and return the produced video path.
    pub async fn render(&self, code_file: &Path) -> MediaResult<PathBuf> {
        if !code_file.exists() {
            return Err(MediaError::FileNotFound(code_file.to_path_buf()));
        }
        match self.docker_image {
            Some(_) => check_docker()?,
            None => check_manim()?,
        };

        let (program, args) = self.build_command(code_file)?;
        info!("Rendering {} with {}", code_file.display(), program);
        debug!("Running: {} {}", program, args.join(" "));

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the future kills the child
                        warn!("Manim timed out after {} seconds", secs);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(MediaError::render_failed(
                format!("{} exited with {}", program, output.status),
                Some(truncate_tail(&String::from_utf8_lossy(&output.stderr))),
            ));
        }

        let video = self.expected_output(code_file);
        if !video.exists() {
            return Err(MediaError::render_failed(
                format!("rendered video not found at {}", video.display()),
                None,
            ));
        }

        Ok(video)
    }
}

/// Keep the last `STDERR_LIMIT` bytes, on a char boundary.
fn truncate_tail(s: &str) -> String {
    if s.len() <= STDERR_LIMIT {
        return s.to_string();
    }
    let mut start = s.len() - STDERR_LIMIT;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
