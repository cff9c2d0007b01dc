use genai::{BilingualText, SceneDraft};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub const MISSING_PROMPT_EN: &str = "[Prompt missing from generation response]";
pub const MISSING_PROMPT_KO: &str = "[생성 응답에 프롬프트가 없습니다]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptAxis {
    Image,
    Video,
}

/// Which of the two variants is chosen. Only two values exist, so a choice
/// can never point outside a scene's variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptChoice {
    #[default]
    First,
    Second,
}

impl PromptChoice {
    pub fn index(self) -> usize {
        match self {
            PromptChoice::First => 0,
            PromptChoice::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PromptChoice::First),
            1 => Some(PromptChoice::Second),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    id: Uuid,
    number: u32,
    story: String,
    image_prompts: [BilingualText; 2],
    video_prompts: [BilingualText; 2],
    image_choice: PromptChoice,
    video_choice: PromptChoice,
}

fn placeholder() -> BilingualText {
    BilingualText::new(MISSING_PROMPT_EN, MISSING_PROMPT_KO)
}

fn two_variants(number: u32, axis: &str, variants: Vec<BilingualText>) -> [BilingualText; 2] {
    let mut kept = variants.into_iter().filter(|v| !v.is_blank());
    let first = kept.next();
    let second = kept.next();
    if first.is_none() || second.is_none() {
        warn!(scene = number, axis, "prompt variant missing, substituting placeholder");
    }
    [
        first.unwrap_or_else(placeholder),
        second.unwrap_or_else(placeholder),
    ]
}

impl Scene {
    /// Build a scene from a response entry. `position` is the entry's
    /// zero-based index and numbers the scene when the entry has no number.
    pub fn from_draft(position: usize, draft: SceneDraft) -> Self {
        let number = draft.scene_number.unwrap_or(position as u32 + 1);
        Self {
            id: Uuid::new_v4(),
            number,
            story: draft.story,
            image_prompts: two_variants(number, "image", draft.image_prompts),
            video_prompts: two_variants(number, "video", draft.video_prompts),
            image_choice: PromptChoice::First,
            video_choice: PromptChoice::First,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn story(&self) -> &str {
        &self.story
    }

    pub fn variants(&self, axis: PromptAxis) -> &[BilingualText; 2] {
        match axis {
            PromptAxis::Image => &self.image_prompts,
            PromptAxis::Video => &self.video_prompts,
        }
    }

    pub fn choice(&self, axis: PromptAxis) -> PromptChoice {
        match axis {
            PromptAxis::Image => self.image_choice,
            PromptAxis::Video => self.video_choice,
        }
    }

    /// Only the selection changes; prompt text is never touched.
    pub fn select(&mut self, axis: PromptAxis, choice: PromptChoice) {
        match axis {
            PromptAxis::Image => self.image_choice = choice,
            PromptAxis::Video => self.video_choice = choice,
        }
    }

    pub fn chosen(&self, axis: PromptAxis) -> &BilingualText {
        &self.variants(axis)[self.choice(axis).index()]
    }
}

/// Turn a structured response into scenes, keeping at most `max` of them.
pub fn scenes_from_drafts(drafts: Vec<SceneDraft>, max: usize) -> Vec<Scene> {
    if drafts.len() > max {
        warn!(received = drafts.len(), max, "scene response too long, truncating");
    }
    drafts
        .into_iter()
        .take(max)
        .enumerate()
        .map(|(position, draft)| Scene::from_draft(position, draft))
        .collect()
}

/// Read-only projection of a scene with its chosen prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneOverviewEntry {
    pub number: u32,
    pub story: String,
    pub image_prompt: BilingualText,
    pub video_prompt: BilingualText,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(image: usize, video: usize) -> SceneDraft {
        SceneDraft {
            scene_number: None,
            story: "story".into(),
            image_prompts: (0..image)
                .map(|i| BilingualText::new(format!("img {i}"), format!("이미지 {i}")))
                .collect(),
            video_prompts: (0..video)
                .map(|i| BilingualText::new(format!("vid {i}"), format!("비디오 {i}")))
                .collect(),
        }
    }

    #[test]
    fn missing_variant_becomes_placeholder() {
        let scene = Scene::from_draft(0, draft(1, 0));
        assert_eq!(scene.number(), 1);
        assert_eq!(scene.variants(PromptAxis::Image)[0].en, "img 0");
        assert_eq!(scene.variants(PromptAxis::Image)[1].en, MISSING_PROMPT_EN);
        assert_eq!(scene.variants(PromptAxis::Video)[0].ko, MISSING_PROMPT_KO);
        assert_eq!(scene.variants(PromptAxis::Video)[1].en, MISSING_PROMPT_EN);
    }

    #[test]
    fn extra_and_blank_variants_are_dropped() {
        let mut d = draft(3, 2);
        d.image_prompts.insert(0, BilingualText::default());
        let scene = Scene::from_draft(4, d);
        assert_eq!(scene.number(), 5);
        assert_eq!(scene.variants(PromptAxis::Image)[0].en, "img 0");
        assert_eq!(scene.variants(PromptAxis::Image)[1].en, "img 1");
    }

    #[test]
    fn selecting_never_changes_text() {
        let mut scene = Scene::from_draft(0, draft(2, 2));
        let before = scene.variants(PromptAxis::Image).clone();
        scene.select(PromptAxis::Image, PromptChoice::Second);
        scene.select(PromptAxis::Image, PromptChoice::Second);
        assert_eq!(scene.variants(PromptAxis::Image), &before);
        assert_eq!(scene.chosen(PromptAxis::Image).en, "img 1");
        assert_eq!(scene.choice(PromptAxis::Video), PromptChoice::First);
        assert_eq!(PromptChoice::from_index(2), None);
    }

    #[test]
    fn truncates_to_max_scenes() {
        let scenes = scenes_from_drafts((0..6).map(|_| draft(2, 2)).collect(), 4);
        assert_eq!(scenes.len(), 4);
        assert_eq!(scenes[3].number(), 4);
    }
}
