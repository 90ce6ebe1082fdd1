//! Narration audio concatenation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Render a concat-demuxer list, one `file '<path>'` line per input.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            // The demuxer closes the quote, emits an escaped quote, and reopens
            let escaped = p.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Write a concat-demuxer list next to the output.
pub async fn write_concat_list(inputs: &[PathBuf], list_path: &Path) -> MediaResult<()> {
    tokio::fs::write(list_path, concat_list(inputs)).await?;
    Ok(())
}

/// Join audio files into one track without re-encoding.
pub async fn concat_audio(
    runner: &FfmpegRunner,
    inputs: &[PathBuf],
    output: &Path,
) -> MediaResult<PathBuf> {
    if inputs.is_empty() {
        return Err(MediaError::invalid_media("no audio segments to concatenate"));
    }
    for input in inputs {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    let list_path = output.with_extension("txt");
    write_concat_list(inputs, &list_path).await?;

    info!(segments = inputs.len(), "Concatenating narration audio");
    concat_audio_list(runner, &list_path, output).await
}

/// Join the files named in an existing concat-demuxer list.
pub async fn concat_audio_list(
    runner: &FfmpegRunner,
    list_path: &Path,
    output: &Path,
) -> MediaResult<PathBuf> {
    if !list_path.exists() {
        return Err(MediaError::FileNotFound(list_path.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .output_args(["-c", "copy"]);
    runner.run(&cmd).await?;

    Ok(output.to_path_buf())
}
