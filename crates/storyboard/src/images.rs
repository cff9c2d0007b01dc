use genai::{GenerativeBackend, ImageRequest, InlineImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StoryError, StoryResult};

pub const CANDIDATES_PER_REQUEST: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: Uuid,
    pub image: InlineImage,
}

impl GeneratedImage {
    pub fn new(image: InlineImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneImages {
    candidates: Vec<GeneratedImage>,
    selected: Option<GeneratedImage>,
}

impl SceneImages {
    pub fn candidates(&self) -> &[GeneratedImage] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&GeneratedImage> {
        self.selected.as_ref()
    }
}

/// Candidate and selected images keyed by scene number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImageSet {
    scenes: BTreeMap<u32, SceneImages>,
}

impl GeneratedImageSet {
    pub fn get(&self, scene: u32) -> Option<&SceneImages> {
        self.scenes.get(&scene)
    }

    pub fn candidates(&self, scene: u32) -> &[GeneratedImage] {
        self.scenes
            .get(&scene)
            .map(|s| s.candidates.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected(&self, scene: u32) -> Option<&GeneratedImage> {
        self.scenes.get(&scene).and_then(|s| s.selected.as_ref())
    }

    pub fn has_candidates(&self, scene: u32) -> bool {
        !self.candidates(scene).is_empty()
    }

    /// Replace the scene's candidates and drop any earlier selection.
    pub fn populate(&mut self, scene: u32, mut candidates: Vec<GeneratedImage>) {
        candidates.truncate(CANDIDATES_PER_REQUEST);
        self.scenes.insert(
            scene,
            SceneImages {
                candidates,
                selected: None,
            },
        );
    }

    /// Narrow the scene to the chosen candidate.
    pub fn select(&mut self, scene: u32, index: usize) -> StoryResult<&GeneratedImage> {
        let entry = self
            .scenes
            .get_mut(&scene)
            .ok_or(StoryError::UnknownCandidate { scene, index })?;
        if index >= entry.candidates.len() {
            return Err(StoryError::UnknownCandidate { scene, index });
        }
        let chosen = entry.candidates.swap_remove(index);
        entry.candidates = vec![chosen.clone()];
        Ok(entry.selected.insert(chosen))
    }

    /// Swap in an edited image as the scene's only candidate and selection.
    pub fn replace_selected(&mut self, scene: u32, image: InlineImage) -> StoryResult<()> {
        let entry = self
            .scenes
            .get_mut(&scene)
            .filter(|s| s.selected.is_some())
            .ok_or(StoryError::SelectionRequired { scene })?;
        let edited = GeneratedImage::new(image);
        entry.candidates = vec![edited.clone()];
        entry.selected = Some(edited);
        Ok(())
    }

    pub fn clear_scene(&mut self, scene: u32) {
        self.scenes.remove(&scene);
    }

    pub fn clear_all(&mut self) {
        self.scenes.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.scenes.values().filter(|s| s.selected.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Everything needed to ask for one scene's candidate pair, detached from
/// the state it will be written back to.
#[derive(Debug, Clone)]
pub struct CandidateRequest {
    pub scene: u32,
    pub images: Vec<InlineImage>,
    pub instruction: String,
}

impl CandidateRequest {
    /// Issue both calls concurrently and keep whichever return an image.
    pub async fn run(&self, backend: &dyn GenerativeBackend) -> StoryResult<Vec<GeneratedImage>> {
        let request = ImageRequest {
            images: self.images.clone(),
            instruction: self.instruction.clone(),
        };
        let (first, second) = tokio::join!(
            backend.generate_image(&request),
            backend.generate_image(&request)
        );
        let mut out = Vec::with_capacity(CANDIDATES_PER_REQUEST);
        for result in [first, second] {
            match result {
                Ok(Some(image)) => out.push(GeneratedImage::new(image)),
                Ok(None) => debug!(scene = self.scene, "candidate call returned no image"),
                Err(err) => warn!(scene = self.scene, error = %err, "candidate call failed"),
            }
        }
        if out.is_empty() {
            return Err(StoryError::NoImageReturned { scene: self.scene });
        }
        Ok(out)
    }
}
