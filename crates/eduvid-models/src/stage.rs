//! Generation stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of the generation pipeline.
///
/// Variants are declared in execution order; `StageName::ALL` is the
/// canonical sequence and nothing may reorder it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Plan the video as a list of timed scenes
    SceneBreakdown,
    /// Generate Manim code for the planned scenes
    CodeGeneration,
    /// Synthesize narration audio per scene
    AudioGeneration,
    /// Join per-scene narration into one track
    AudioConcatenation,
    /// Write an SRT file from scene narration
    SubtitleGeneration,
    /// Render the Manim animation
    Rendering,
    /// Stretch/loop the animation to the narration length and mux
    Sync,
    /// Burn subtitles into the synced video
    SubtitleBurnIn,
    /// Produce the deliverable mp4
    Finalize,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [StageName; 9] = [
        StageName::SceneBreakdown,
        StageName::CodeGeneration,
        StageName::AudioGeneration,
        StageName::AudioConcatenation,
        StageName::SubtitleGeneration,
        StageName::Rendering,
        StageName::Sync,
        StageName::SubtitleBurnIn,
        StageName::Finalize,
    ];

    /// Stable key used on the wire and in client timelines.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::SceneBreakdown => "scene_breakdown",
            StageName::CodeGeneration => "code_generation",
            StageName::AudioGeneration => "audio_generation",
            StageName::AudioConcatenation => "audio_concatenation",
            StageName::SubtitleGeneration => "subtitle_generation",
            StageName::Rendering => "rendering",
            StageName::Sync => "sync",
            StageName::SubtitleBurnIn => "subtitle_burn_in",
            StageName::Finalize => "finalize",
        }
    }

    /// Key under which this stage stores its artifact in `results`.
    pub fn artifact_key(&self) -> &'static str {
        match self {
            StageName::SceneBreakdown => "scenes",
            StageName::CodeGeneration => "manim_code",
            StageName::AudioGeneration => "scene_audio",
            StageName::AudioConcatenation => "audio",
            StageName::SubtitleGeneration => "subtitles",
            StageName::Rendering => "animation",
            StageName::Sync => "synced_video",
            StageName::SubtitleBurnIn => "subtitled_video",
            StageName::Finalize => "final_video",
        }
    }

    /// Human-readable label for progress displays.
    pub fn title(&self) -> &'static str {
        match self {
            StageName::SceneBreakdown => "Planning scenes",
            StageName::CodeGeneration => "Generating animation code",
            StageName::AudioGeneration => "Generating narration",
            StageName::AudioConcatenation => "Joining narration audio",
            StageName::SubtitleGeneration => "Writing subtitles",
            StageName::Rendering => "Rendering animation",
            StageName::Sync => "Syncing video and audio",
            StageName::SubtitleBurnIn => "Adding subtitles",
            StageName::Finalize => "Finalizing video",
        }
    }

    /// Position of this stage in `ALL`.
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// Parse a stage from its wire key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == key)
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
