//! Clients for the language-model and speech services.
//!
//! Both services speak the OpenAI-compatible HTTP API:
//! - `/chat/completions` for scene planning and Manim code generation
//! - `/audio/speech` for narration
//!
//! Prompt construction and response clean-up live in [`prompts`].

pub mod client;
pub mod error;
pub mod prompts;
pub mod types;

pub use client::{AiClient, AiClientConfig};
pub use error::{AiError, AiResult};
pub use prompts::{extract_code_block, parse_scenes};
