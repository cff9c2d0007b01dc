use genai::BilingualText;

use crate::error::{StoryError, StoryResult};
use crate::scene::{PromptAxis, PromptChoice, Scene, SceneOverviewEntry};

/// Parallel arrays produced when picking is finished, one entry per scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickedPrompts {
    pub image_prompts: Vec<BilingualText>,
    pub video_prompts: Vec<BilingualText>,
    pub stories: Vec<String>,
}

impl PickedPrompts {
    /// Scene numbers follow array order starting at 1.
    pub fn into_entries(self) -> Vec<SceneOverviewEntry> {
        self.image_prompts
            .into_iter()
            .zip(self.video_prompts)
            .zip(self.stories)
            .enumerate()
            .map(|(idx, ((image_prompt, video_prompt), story))| SceneOverviewEntry {
                number: idx as u32 + 1,
                story,
                image_prompt,
                video_prompt,
            })
            .collect()
    }
}

/// Pages through the generated scenes one at a time.
#[derive(Debug, Clone)]
pub struct ScenePicker {
    scenes: Vec<Scene>,
    index: usize,
}

impl ScenePicker {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes, index: 0 }
    }

    /// An empty picker only offers going back.
    pub fn is_dead_end(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Scene> {
        self.scenes.get(self.index)
    }

    pub fn is_last(&self) -> bool {
        !self.scenes.is_empty() && self.index + 1 == self.scenes.len()
    }

    pub fn can_previous(&self) -> bool {
        self.index > 0
    }

    pub fn can_next(&self) -> bool {
        self.index + 1 < self.scenes.len()
    }

    /// Clamped: no-op on the first scene.
    pub fn previous(&mut self) -> usize {
        if self.can_previous() {
            self.index -= 1;
        }
        self.index
    }

    /// Clamped: no-op on the last scene.
    pub fn next(&mut self) -> usize {
        if self.can_next() {
            self.index += 1;
        }
        self.index
    }

    pub fn select(&mut self, axis: PromptAxis, choice: PromptChoice) -> StoryResult<()> {
        let scene = self
            .scenes
            .get_mut(self.index)
            .ok_or(StoryError::NoScenes)?;
        scene.select(axis, choice);
        Ok(())
    }

    pub fn finish(&self) -> StoryResult<PickedPrompts> {
        if self.is_dead_end() {
            return Err(StoryError::NoScenes);
        }
        if !self.is_last() {
            return Err(StoryError::PickerIncomplete);
        }
        Ok(PickedPrompts {
            image_prompts: self
                .scenes
                .iter()
                .map(|s| s.chosen(PromptAxis::Image).clone())
                .collect(),
            video_prompts: self
                .scenes
                .iter()
                .map(|s| s.chosen(PromptAxis::Video).clone())
                .collect(),
            stories: self.scenes.iter().map(|s| s.story().to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai::MockBackend;

    fn picker() -> ScenePicker {
        ScenePicker::new(crate::scene::scenes_from_drafts(MockBackend::default_scenes(), 10))
    }

    #[test]
    fn navigation_is_clamped() {
        let mut p = picker();
        assert_eq!(p.previous(), 0);
        assert_eq!(p.next(), 1);
        assert_eq!(p.next(), 2);
        assert_eq!(p.next(), 2);
        assert!(p.is_last());
    }

    #[test]
    fn finish_projects_selected_variants() {
        let mut p = picker();
        assert!(matches!(p.finish(), Err(StoryError::PickerIncomplete)));
        p.select(PromptAxis::Image, PromptChoice::Second).unwrap();
        p.next();
        p.select(PromptAxis::Video, PromptChoice::Second).unwrap();
        p.next();
        let picked = p.finish().unwrap();
        assert_eq!(picked.image_prompts[0].en, "Close-up, scene 1");
        assert_eq!(picked.image_prompts[1].en, "Wide shot, scene 2");
        assert_eq!(picked.video_prompts[1].en, "Dolly in, scene 2");
        assert_eq!(picked.stories.len(), 3);

        let entries = picked.into_entries();
        assert_eq!(entries[2].number, 3);
        assert_eq!(entries[0].story, "Scene 1 of the mock story.");
    }

    #[test]
    fn empty_picker_is_a_dead_end() {
        let mut p = ScenePicker::new(Vec::new());
        assert!(p.is_dead_end());
        assert!(p.current().is_none());
        assert_eq!(p.next(), 0);
        assert!(matches!(p.finish(), Err(StoryError::NoScenes)));
        assert!(matches!(
            p.select(PromptAxis::Image, PromptChoice::First),
            Err(StoryError::NoScenes)
        ));
    }
}
