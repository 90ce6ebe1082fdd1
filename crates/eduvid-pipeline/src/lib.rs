//! Video generation pipeline.
//!
//! This crate provides:
//! - The process-wide job store with guarded status transitions
//! - The nine generation stages, each a function of the job's accumulated results
//! - The runner that executes stages sequentially per job, with a cap on
//!   concurrently running jobs
//! - Collaborator traits for the language model, speech, renderer and media tool

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod services;
pub mod stages;
pub mod store;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use runner::PipelineRunner;
pub use services::{
    AnimationRenderer, FfmpegMedia, ManimAnimation, MediaProcessor, Services, SpeechSynthesizer,
    TextGenerator,
};
pub use stages::StageContext;
pub use store::JobStore;
