//! Prompt text and response clean-up.

use eduvid_models::Scene;

use crate::error::{AiError, AiResult};

pub const PLANNER_SYSTEM_PROMPT: &str = "You are an expert educational video planner.";
pub const MANIM_SYSTEM_PROMPT: &str = "You are an expert Manim programmer.";

/// Prompt asking for a timed scene breakdown as a JSON array.
pub fn scene_breakdown_prompt(description: &str) -> String {
    format!(
        r#"You are an educational video planner.

Given this content description:
{description}

Create a detailed scene-by-scene breakdown for a 60-90 second educational video.

For each scene, provide:
1. Scene number
2. Duration (in seconds)
3. Visual description (what should be animated)
4. Narration text (what should be said)
5. Key concepts to emphasize

Return the breakdown as a JSON array with this structure:
[
  {{
    "scene": 1,
    "duration": 10,
    "visual": "Description of what to show",
    "narration": "Text to narrate",
    "key_concepts": ["concept1", "concept2"]
  }}
]

Return ONLY valid JSON, no additional text."#
    )
}

/// Prompt asking for one `EducationalScene` class timed to `scenes`.
pub fn manim_code_prompt(scenes: &[Scene], scene_class: &str) -> AiResult<String> {
    let scenes_json = serde_json::to_string_pretty(scenes)?;
    Ok(format!(
        r#"Generate complete Manim code for these timed scenes:
{scenes_json}

Requirements:
- Use Manim Community Edition syntax
- Create ONE Scene class named '{scene_class}'
- Each scene should match the specified duration exactly using wait() or run_time parameters
- Use self.wait() between scenes for proper pacing
- Include smooth transitions between scenes
- Make sure total video length matches sum of scene durations

Timing tips:
- Use run_time in animations: self.play(FadeIn(obj), run_time=2)
- Use self.wait(duration) for pauses

Return ONLY the Python code, no explanations."#
    ))
}

/// Strip a surrounding markdown fence (```json, ```python or bare ```).
///
/// Text without a fence is returned trimmed. If there are several fenced
/// blocks the first one wins.
pub fn extract_code_block(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };

    let after_open = &text[open + 3..];
    // Drop the language tag on the opening line
    let body = match after_open.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after_open,
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse a scene breakdown response.
pub fn parse_scenes(text: &str) -> AiResult<Vec<Scene>> {
    let scenes: Vec<Scene> = serde_json::from_str(extract_code_block(text))
        .map_err(|e| AiError::invalid_response(format!("scene breakdown is not valid JSON: {e}")))?;

    if scenes.is_empty() {
        return Err(AiError::invalid_response("scene breakdown is empty"));
    }
    if let Some(bad) = scenes.iter().find(|s| s.narration.trim().is_empty()) {
        return Err(AiError::invalid_response(format!(
            "scene {} has no narration",
            bad.scene
        )));
    }

    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain() {
        assert_eq!(extract_code_block("  [1, 2]\n"), "[1, 2]");
        assert_eq!(extract_code_block("```[1]```"), "[1]");
    }

    #[test]
    fn test_extract_json_fence() {
        let text = "Here you go:\n```json\n[{\"a\": 1}]\n```\nEnjoy";
        assert_eq!(extract_code_block(text), "[{\"a\": 1}]");
    }

    #[test]
    fn test_extract_python_fence() {
        let text = "```python\nfrom manim import *\n\nclass EducationalScene(Scene):\n    pass\n```";
        assert!(extract_code_block(text).starts_with("from manim import *"));
        assert!(extract_code_block(text).ends_with("pass"));
    }

    #[test]
    fn test_extract_unterminated_fence() {
        assert_eq!(extract_code_block("```\nx = 1\n"), "x = 1");
    }

    #[test]
    fn test_parse_scenes() {
        let text = "```json\n[{\"scene\": 1, \"duration\": 8, \"visual\": \"v\", \"narration\": \"Hello.\", \"key_concepts\": []}]\n```";
        let scenes = parse_scenes(text).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].narration, "Hello.");
    }

    #[test]
    fn test_parse_scenes_rejects_empty_and_garbage() {
        assert!(parse_scenes("[]").is_err());
        assert!(parse_scenes("I cannot do that").is_err());
        assert!(parse_scenes(r#"[{"scene": 1, "duration": 3, "narration": "  "}]"#).is_err());
    }

    #[test]
    fn test_prompts_mention_inputs() {
        assert!(scene_breakdown_prompt("Pythagoras").contains("Pythagoras"));
        let scenes = vec![Scene {
            scene: 1,
            duration: 5.0,
            visual: "triangle".into(),
            narration: "a squared".into(),
            key_concepts: vec![],
        }];
        let prompt = manim_code_prompt(&scenes, "EducationalScene").unwrap();
        assert!(prompt.contains("'EducationalScene'"));
        assert!(prompt.contains("a squared"));
    }
}
