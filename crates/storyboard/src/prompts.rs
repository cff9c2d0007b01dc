//! Instruction text sent to the generation service.

use crate::config::{StoryConfiguration, StoryStyle, VideoType};

pub fn brainstorm_prompt(idea: &str, style: StoryStyle) -> String {
    let idea = idea.trim();
    if idea.is_empty() {
        format!(
            "Invent an original, vivid opening for a short {} story that could be told in a few \
             illustrated scenes. Write one paragraph of plain prose. Return only the paragraph.",
            style.label().to_lowercase()
        )
    } else {
        format!(
            "Rewrite this story idea as a more vivid and concrete opening paragraph for a short {} \
             story. Keep the core idea and characters. Return only the paragraph.\n\nIdea: {idea}",
            style.label().to_lowercase()
        )
    }
}

pub fn scene_instructions(config: &StoryConfiguration) -> String {
    let range = config.scene_count_range();
    let mut out = String::from(
        "You are a storyboard artist planning a short AI-generated video from a story idea and a \
         reference image.\n",
    );
    out.push_str(&format!("Story idea: {}\n", config.idea.trim()));
    out.push_str(&format!("Story style: {}\n", config.story_style.label()));
    out.push_str(&format!("Image style: {}\n", config.image_style.label()));
    match config.video_type {
        VideoType::Loop => out.push_str(
            "Video type: seamless loop. The last scene must flow naturally back into the first.\n",
        ),
        VideoType::Story => out.push_str(&format!(
            "Video type: story with a clear beginning, middle and end, about {} long.\n",
            config.video_length.label()
        )),
    }
    out.push_str(&format!(
        "Create between {} and {} scenes, numbered from 1.\n",
        range.start(),
        range.end()
    ));
    out.push_str(
        "For every scene write the story text, exactly two alternative image-generation prompts \
         and exactly two alternative image-to-video prompts. Each prompt has an English (en) and a \
         Korean (ko) version. Image prompts must keep the characters and look of the reference \
         image. Video prompts describe camera and subject motion starting from that scene's \
         image.\nRespond with the JSON array only.",
    );
    out
}

/// Wrap a scene prompt so the result follows the reference style and, when a
/// previous image is attached, continues its composition.
pub fn scene_image_instruction(prompt: &str, config: &StoryConfiguration, continuity: bool) -> String {
    let mut out = String::from(
        "The first image is the style reference. Match its art style, color palette, character \
         design and rendering exactly.",
    );
    if continuity {
        out.push_str(
            " The second image is the previous scene. Keep the same characters, setting and \
             composition so this scene follows on from it.",
        );
    }
    out.push_str(&format!(
        " Render in a {} style.\n\nScene: {}",
        config.image_style.label().to_lowercase(),
        prompt.trim()
    ));
    out
}

pub fn mask_edit_instruction(user_instruction: &str) -> String {
    format!(
        "The semi-transparent red strokes mark the area to change. Edit only that area, remove the \
         red marks, and keep everything else identical.\n\nInstruction: {}",
        user_instruction.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoLength;

    #[test]
    fn brainstorm_switches_on_empty_idea() {
        assert!(brainstorm_prompt("  ", StoryStyle::Mystery).starts_with("Invent"));
        let rewrite = brainstorm_prompt("A robot detective", StoryStyle::Mystery);
        assert!(rewrite.contains("Idea: A robot detective"));
        assert!(rewrite.contains("mystery"));
    }

    #[test]
    fn scene_instructions_carry_config() {
        let config = StoryConfiguration {
            idea: "A robot detective".into(),
            video_type: VideoType::Story,
            video_length: VideoLength::Medium,
            ..StoryConfiguration::default()
        };
        let text = scene_instructions(&config);
        assert!(text.contains("A robot detective"));
        assert!(text.contains("between 5 and 7 scenes"));
        assert!(text.contains("30 seconds"));
    }

    #[test]
    fn continuity_clause_only_with_previous_image() {
        let config = StoryConfiguration::default();
        assert!(!scene_image_instruction("a cat", &config, false).contains("previous scene"));
        assert!(scene_image_instruction("a cat", &config, true).contains("previous scene"));
    }
}
