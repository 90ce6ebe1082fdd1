//! Background music mixing.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

fn mix_filter(volume: f64) -> String {
    format!(
        "[1:a]volume={:.2}[music];[0:a][music]amix=inputs=2:duration=first[a]",
        volume.clamp(0.0, 1.0)
    )
}

/// Lay a music track under the narration of `video` at `volume` (0.0 to 1.0).
pub async fn add_background_music(
    runner: &FfmpegRunner,
    video: &Path,
    music: &Path,
    volume: f64,
    output: &Path,
) -> MediaResult<PathBuf> {
    for path in [video, music] {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
    }

    info!(volume, "Mixing background music from {}", music.display());

    let cmd = FfmpegCommand::new(video, output)
        .add_input(music)
        .filter_complex(mix_filter(volume))
        .map("0:v")
        .map("[a]")
        .video_codec("copy")
        .audio_codec("aac");
    runner.run(&cmd).await?;

    Ok(output.to_path_buf())
}
