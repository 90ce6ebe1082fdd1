//! Scene breakdown entries produced by the planning prompt.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One timed scene of the planned video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 1-based scene number
    pub scene: u32,
    /// Duration in seconds
    pub duration: f64,
    /// What should be animated
    #[serde(default)]
    pub visual: String,
    /// What should be said
    pub narration: String,
    /// Concepts to emphasize
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

impl Scene {
    /// Total planned duration of a scene list.
    pub fn total_duration(scenes: &[Scene]) -> f64 {
        scenes.iter().map(|s| s.duration.max(0.0)).sum()
    }
}
