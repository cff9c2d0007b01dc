use genai::{GenerativeBackend, InlineImage};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::StoryConfiguration;
use crate::error::{StoryError, StoryResult};
use crate::export;
use crate::images::{CandidateRequest, GeneratedImage, GeneratedImageSet};
use crate::prompts;
use crate::scene::SceneOverviewEntry;
use crate::sequential::{SequentialRun, SequentialStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateAllReport {
    pub generated: Vec<u32>,
    pub skipped: Vec<u32>,
    pub failed: Vec<u32>,
}

/// Per-scene image generation and selection for the final step.
#[derive(Debug, Clone, Default)]
pub struct SceneOverview {
    entries: Vec<SceneOverviewEntry>,
    images: GeneratedImageSet,
    loading: BTreeSet<u32>,
    sequential: Option<SequentialRun>,
}

impl SceneOverview {
    pub fn new(entries: Vec<SceneOverviewEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[SceneOverviewEntry] {
        &self.entries
    }

    pub fn images(&self) -> &GeneratedImageSet {
        &self.images
    }

    pub fn is_loading(&self, scene: u32) -> bool {
        self.loading.contains(&scene)
    }

    pub fn any_loading(&self) -> bool {
        !self.loading.is_empty()
    }

    fn position(&self, scene: u32) -> StoryResult<usize> {
        self.entries
            .iter()
            .position(|e| e.number == scene)
            .ok_or(StoryError::UnknownScene(scene))
    }

    /// Per-scene and bulk actions would bypass the pick-before-next order.
    fn ensure_no_sequential_run(&self) -> StoryResult<()> {
        if self.sequential.is_some() {
            return Err(StoryError::SequentialRunActive);
        }
        Ok(())
    }

    fn previous_selected(&self, scene: u32) -> StoryResult<Option<&GeneratedImage>> {
        let pos = self.position(scene)?;
        Ok(match pos.checked_sub(1) {
            Some(prev) => self.images.selected(self.entries[prev].number),
            None => None,
        })
    }

    /// Build the request for one scene. The reference image always goes
    /// first; `continuity` follows it when present.
    pub fn candidate_request(
        &self,
        config: &StoryConfiguration,
        scene: u32,
        continuity: Option<InlineImage>,
    ) -> StoryResult<CandidateRequest> {
        let entry = &self.entries[self.position(scene)?];
        let reference = config
            .reference_image()
            .ok_or(StoryError::MissingReferenceImage)?;
        let instruction = prompts::scene_image_instruction(
            entry.image_prompt.primary(),
            config,
            continuity.is_some(),
        );
        let mut images = vec![reference.clone()];
        images.extend(continuity);
        Ok(CandidateRequest {
            scene,
            images,
            instruction,
        })
    }

    pub fn begin(&mut self, scene: u32) {
        self.loading.insert(scene);
    }

    /// Write a finished request back. Failures leave the scene as it was.
    pub fn apply(
        &mut self,
        scene: u32,
        result: StoryResult<Vec<GeneratedImage>>,
    ) -> StoryResult<()> {
        self.loading.remove(&scene);
        let candidates = result?;
        self.images.populate(scene, candidates);
        Ok(())
    }

    /// Generate one scene's candidate pair. With `chain`, the previous
    /// scene's selected image (if any) is sent for continuity.
    pub async fn generate_scene(
        &mut self,
        backend: &dyn GenerativeBackend,
        config: &StoryConfiguration,
        scene: u32,
        chain: bool,
    ) -> StoryResult<()> {
        self.ensure_no_sequential_run()?;
        let continuity = if chain {
            self.previous_selected(scene)?.map(|img| img.image.clone())
        } else {
            None
        };
        let request = self.candidate_request(config, scene, continuity)?;
        self.begin(scene);
        info!(scene, continuity = request.images.len() > 1, "generating scene candidates");
        let result = request.run(backend).await;
        if let Err(err) = &result {
            warn!(scene, error = %err, "scene generation failed");
        }
        self.apply(scene, result)
    }

    /// Drop the scene's candidates and selection, then generate again.
    pub async fn regenerate_scene(
        &mut self,
        backend: &dyn GenerativeBackend,
        config: &StoryConfiguration,
        scene: u32,
        chain: bool,
    ) -> StoryResult<()> {
        self.ensure_no_sequential_run()?;
        self.position(scene)?;
        self.images.clear_scene(scene);
        self.generate_scene(backend, config, scene, chain).await
    }

    /// Walk scenes in order, one scene in flight at a time, skipping scenes
    /// that already have candidates. A failed scene does not stop the walk.
    pub async fn generate_all(
        &mut self,
        backend: &dyn GenerativeBackend,
        config: &StoryConfiguration,
        chain: bool,
    ) -> StoryResult<GenerateAllReport> {
        self.ensure_no_sequential_run()?;
        if !config.has_reference_image() {
            return Err(StoryError::MissingReferenceImage);
        }
        let numbers: Vec<u32> = self.entries.iter().map(|e| e.number).collect();
        let mut report = GenerateAllReport::default();
        for scene in numbers {
            if self.images.has_candidates(scene) {
                report.skipped.push(scene);
                continue;
            }
            match self.generate_scene(backend, config, scene, chain).await {
                Ok(()) => report.generated.push(scene),
                Err(StoryError::MissingCredential(msg)) => {
                    return Err(StoryError::MissingCredential(msg))
                }
                Err(_) => report.failed.push(scene),
            }
        }
        info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "generate all finished"
        );
        Ok(report)
    }

    pub fn select_image(&mut self, scene: u32, index: usize) -> StoryResult<&GeneratedImage> {
        self.ensure_no_sequential_run()?;
        self.position(scene)?;
        self.images.select(scene, index)
    }

    pub fn replace_selected_image(&mut self, scene: u32, image: InlineImage) -> StoryResult<()> {
        self.position(scene)?;
        info!(scene, "selected image replaced by edit");
        self.images.replace_selected(scene, image)
    }

    /// Called whenever the reference image changes.
    pub fn invalidate_images(&mut self) {
        if !self.images.is_empty() || self.sequential.is_some() {
            info!("reference changed, clearing generated images");
        }
        self.images.clear_all();
        self.loading.clear();
        self.sequential = None;
    }

    pub fn can_download_all(&self) -> bool {
        self.images.selected_count() == self.entries.len()
    }

    pub fn download_all(&self, dir: &Path) -> StoryResult<Vec<PathBuf>> {
        if let Some(missing) = self
            .entries
            .iter()
            .find(|e| self.images.selected(e.number).is_none())
        {
            return Err(StoryError::SelectionRequired {
                scene: missing.number,
            });
        }
        let selected: Vec<(u32, &InlineImage)> = self
            .entries
            .iter()
            .filter_map(|e| self.images.selected(e.number).map(|img| (e.number, &img.image)))
            .collect();
        export::save_images(dir, &selected)
    }

    pub fn sequential(&self) -> Option<&SequentialRun> {
        self.sequential.as_ref()
    }

    /// Start a blocking run from the first scene, discarding earlier images.
    pub fn start_sequential(&mut self) -> StoryResult<SequentialStatus> {
        if self.entries.is_empty() {
            return Err(StoryError::NoScenes);
        }
        self.images.clear_all();
        self.loading.clear();
        self.sequential = Some(SequentialRun::new());
        self.sequential_status()
    }

    pub fn sequential_status(&self) -> StoryResult<SequentialStatus> {
        let run = self.sequential.as_ref().ok_or(StoryError::NoSequentialRun)?;
        Ok(match self.entries.get(run.cursor()) {
            None => SequentialStatus::Finished,
            Some(entry) if self.images.has_candidates(entry.number) => {
                SequentialStatus::AwaitingPick(entry.number)
            }
            Some(entry) => SequentialStatus::NeedsCandidates(entry.number),
        })
    }

    /// Request candidates for the current scene, seeded with the previous
    /// scene's pick.
    pub async fn sequential_generate(
        &mut self,
        backend: &dyn GenerativeBackend,
        config: &StoryConfiguration,
    ) -> StoryResult<SequentialStatus> {
        let cursor = self
            .sequential
            .as_ref()
            .ok_or(StoryError::NoSequentialRun)?
            .cursor();
        let Some(entry) = self.entries.get(cursor) else {
            return Ok(SequentialStatus::Finished);
        };
        let scene = entry.number;
        let continuity = match cursor.checked_sub(1) {
            Some(prev) => {
                let prev_scene = self.entries[prev].number;
                let picked = self
                    .images
                    .selected(prev_scene)
                    .ok_or(StoryError::SelectionRequired { scene: prev_scene })?;
                Some(picked.image.clone())
            }
            None => None,
        };
        let request = self.candidate_request(config, scene, continuity)?;
        self.begin(scene);
        let result = request.run(backend).await;
        self.apply(scene, result)?;
        self.sequential_status()
    }

    /// Pick a candidate for the current scene and move to the next one.
    pub fn sequential_pick(&mut self, index: usize) -> StoryResult<SequentialStatus> {
        let cursor = self
            .sequential
            .as_ref()
            .ok_or(StoryError::NoSequentialRun)?
            .cursor();
        let scene = self
            .entries
            .get(cursor)
            .map(|e| e.number)
            .ok_or(StoryError::NoSequentialRun)?;
        self.images.select(scene, index)?;
        if let Some(run) = self.sequential.as_mut() {
            run.advance();
        }
        self.sequential_status()
    }

    /// Abandon the run and everything it produced.
    pub fn cancel_sequential(&mut self) {
        info!("sequential run cancelled");
        self.sequential = None;
        self.images.clear_all();
        self.loading.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::ScenePicker;
    use crate::scene::scenes_from_drafts;
    use genai::{MockBackend, MockCall, MockImageOutcome};

    fn config() -> StoryConfiguration {
        let mut config = StoryConfiguration::default();
        config.set_reference_image(InlineImage::from_bytes("image/png", b"ref"));
        config
    }

    fn overview() -> SceneOverview {
        let mut picker = ScenePicker::new(scenes_from_drafts(MockBackend::default_scenes(), 10));
        picker.next();
        picker.next();
        SceneOverview::new(picker.finish().unwrap().into_entries())
    }

    #[tokio::test]
    async fn generate_scene_sends_reference_first() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_scene(&backend, &config(), 2, false).await.unwrap();
        assert_eq!(ov.images().candidates(2).len(), 2);
        assert!(!ov.is_loading(2));
        for call in backend.image_calls() {
            match call {
                MockCall::Image { instruction, image_count } => {
                    assert_eq!(image_count, 1);
                    assert!(instruction.contains("Wide shot, scene 2"));
                }
                other => panic!("unexpected call {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn failed_scene_leaves_state_untouched() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_scene(&backend, &config(), 1, false).await.unwrap();
        ov.select_image(1, 0).unwrap();
        let before = ov.images().clone();

        backend.queue_image_outcomes([MockImageOutcome::Empty, MockImageOutcome::Empty]);
        let err = ov.generate_scene(&backend, &config(), 1, false).await;
        assert!(matches!(err, Err(StoryError::NoImageReturned { scene: 1 })));
        assert_eq!(ov.images(), &before);
        assert!(!ov.any_loading());
    }

    #[tokio::test]
    async fn regenerate_clears_selection() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_scene(&backend, &config(), 1, false).await.unwrap();
        ov.select_image(1, 1).unwrap();
        ov.regenerate_scene(&backend, &config(), 1, false).await.unwrap();
        assert!(ov.images().selected(1).is_none());
        assert_eq!(ov.images().candidates(1).len(), 2);
    }

    #[tokio::test]
    async fn generate_all_skips_existing_and_continues_past_failures() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_scene(&backend, &config(), 1, false).await.unwrap();
        backend.queue_image_outcomes([
            MockImageOutcome::Error("a".into()),
            MockImageOutcome::Error("b".into()),
        ]);
        let report = ov.generate_all(&backend, &config(), false).await.unwrap();
        assert_eq!(report.skipped, vec![1]);
        assert_eq!(report.failed, vec![2]);
        assert_eq!(report.generated, vec![3]);
        assert_eq!(backend.image_calls().len(), 6);
    }

    #[tokio::test]
    async fn chained_generation_uses_previous_pick() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_scene(&backend, &config(), 1, true).await.unwrap();
        ov.select_image(1, 0).unwrap();
        ov.generate_scene(&backend, &config(), 2, true).await.unwrap();
        let counts: Vec<usize> = backend
            .image_calls()
            .into_iter()
            .map(|c| match c {
                MockCall::Image { image_count, .. } => image_count,
                _ => 0,
            })
            .collect();
        assert_eq!(counts, vec![1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn download_requires_every_scene_selected() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.generate_all(&backend, &config(), false).await.unwrap();
        assert!(!ov.can_download_all());
        ov.select_image(1, 0).unwrap();
        ov.select_image(2, 1).unwrap();
        assert!(!ov.can_download_all());
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ov.download_all(dir.path()),
            Err(StoryError::SelectionRequired { scene: 3 })
        ));
        ov.select_image(3, 0).unwrap();
        assert!(ov.can_download_all());
        let files = ov.download_all(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("scene_01.png"));
    }

    #[tokio::test]
    async fn cancel_discards_the_whole_sequence() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.start_sequential().unwrap();
        ov.sequential_generate(&backend, &config()).await.unwrap();
        ov.sequential_pick(0).unwrap();
        ov.sequential_generate(&backend, &config()).await.unwrap();
        ov.cancel_sequential();
        assert!(ov.images().is_empty());
        assert!(ov.sequential().is_none());
        assert!(matches!(
            ov.sequential_status(),
            Err(StoryError::NoSequentialRun)
        ));
    }

    #[tokio::test]
    async fn active_run_blocks_out_of_order_actions() {
        let backend = MockBackend::default();
        let mut ov = overview();
        ov.start_sequential().unwrap();
        assert!(matches!(
            ov.generate_all(&backend, &config(), false).await,
            Err(StoryError::SequentialRunActive)
        ));
        assert!(matches!(
            ov.generate_scene(&backend, &config(), 2, false).await,
            Err(StoryError::SequentialRunActive)
        ));
        assert!(matches!(
            ov.regenerate_scene(&backend, &config(), 1, false).await,
            Err(StoryError::SequentialRunActive)
        ));
        assert!(backend.image_calls().is_empty());

        ov.sequential_generate(&backend, &config()).await.unwrap();
        assert!(matches!(
            ov.select_image(1, 0),
            Err(StoryError::SequentialRunActive)
        ));
        ov.cancel_sequential();
        ov.generate_scene(&backend, &config(), 1, false).await.unwrap();
    }

    #[test]
    fn missing_reference_is_rejected() {
        let ov = overview();
        assert!(matches!(
            ov.candidate_request(&StoryConfiguration::default(), 1, None),
            Err(StoryError::MissingReferenceImage)
        ));
        assert!(matches!(
            ov.candidate_request(&config(), 9, None),
            Err(StoryError::UnknownScene(9))
        ));
    }

    #[test]
    fn empty_overview_allows_download_of_nothing() {
        let ov = SceneOverview::new(Vec::new());
        assert!(ov.can_download_all());
    }
}
