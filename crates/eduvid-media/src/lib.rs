//! FFmpeg and Manim CLI wrappers for video assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Stderr capture for failed commands
//! - Timeouts for long-running subprocesses
//! - The media operations the generation pipeline needs: audio concat,
//!   subtitle writing and burn-in, A/V sync, background music mixing
//! - Manim rendering, locally or inside a Docker image

pub mod audio;
pub mod command;
pub mod error;
pub mod manim;
pub mod mix;
pub mod probe;
pub mod subtitles;
pub mod sync;

pub use audio::{concat_audio, concat_audio_list, concat_list, write_concat_list};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use manim::{check_docker, check_manim, ManimRenderer, SCENE_CLASS};
pub use mix::add_background_music;
pub use probe::probe_duration;
pub use subtitles::{build_srt, burn_subtitles, format_srt_time, subtitles_filter, write_srt};
pub use sync::{sync_video_and_audio, SyncPlan};
