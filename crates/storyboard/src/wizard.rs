//! Root controller threading configuration and generated data between the
//! intake, picker and overview steps, with the mask editor as an overlay.

use genai::{GenerativeBackend, InlineImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::error::{StoryError, StoryResult};
use crate::i18n::{self, Locale};
use crate::images::GeneratedImage;
use crate::intake::{IdeaForm, UploadedFile};
use crate::mask::MaskEditor;
use crate::overview::{GenerateAllReport, SceneOverview};
use crate::picker::ScenePicker;
use crate::sequential::SequentialStatus;

const MISSING_CREDENTIAL: &str = "no generation backend is configured (set GEMINI_API_KEY)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Idea,
    Generator,
    Overview,
}

impl Step {
    pub fn title_key(self) -> &'static str {
        match self {
            Step::Idea => "step.idea",
            Step::Generator => "step.generator",
            Step::Overview => "step.overview",
        }
    }
}

/// Which image an open editor writes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Reference,
    Scene(u32),
}

pub struct Wizard {
    step: Step,
    locale: Locale,
    form: IdeaForm,
    picker: Option<ScenePicker>,
    overview: Option<SceneOverview>,
    editor: Option<(EditTarget, MaskEditor)>,
    backend: Option<Arc<dyn GenerativeBackend>>,
}

impl Wizard {
    /// A wizard without a backend still accepts input, but every generation
    /// action fails with a setup error.
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>) -> Self {
        Self {
            step: Step::Idea,
            locale: Locale::default(),
            form: IdeaForm::new(),
            picker: None,
            overview: None,
            editor: None,
            backend,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Localized message for an error raised by this wizard.
    pub fn message(&self, err: &StoryError) -> &'static str {
        i18n::tr(self.locale, err.message_key())
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> StoryResult<Arc<dyn GenerativeBackend>> {
        self.backend
            .clone()
            .ok_or_else(|| StoryError::MissingCredential(MISSING_CREDENTIAL.to_string()))
    }

    fn require(&self, expected: Step) -> StoryResult<()> {
        if self.step != expected {
            return Err(StoryError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    pub fn form(&self) -> &IdeaForm {
        &self.form
    }

    /// Idea fields are only editable on the first step.
    pub fn form_mut(&mut self) -> StoryResult<&mut IdeaForm> {
        self.require(Step::Idea)?;
        Ok(&mut self.form)
    }

    pub async fn brainstorm(&mut self) -> StoryResult<String> {
        self.require(Step::Idea)?;
        let backend = self.backend()?;
        Ok(self.form.brainstorm(backend.as_ref()).await?.to_string())
    }

    /// Swap the reference image from any step. Every generated image is
    /// dropped since it was drawn against the old reference.
    pub fn attach_reference(&mut self, file: &UploadedFile) -> StoryResult<()> {
        self.form.attach_reference(file)?;
        if let Some(overview) = self.overview.as_mut() {
            overview.invalidate_images();
        }
        Ok(())
    }

    fn replace_reference(&mut self, image: InlineImage) {
        self.form.replace_reference(image);
        if let Some(overview) = self.overview.as_mut() {
            overview.invalidate_images();
        }
    }

    /// Request scenes and move to the picker. Validation runs before the
    /// credential check so input errors are reported first.
    pub async fn submit(&mut self, progress: Option<&watch::Sender<u8>>) -> StoryResult<usize> {
        self.require(Step::Idea)?;
        self.form.validate_submission()?;
        let backend = self.backend()?;
        let scenes = self.form.submit(backend.as_ref(), progress).await?;
        let count = scenes.len();
        self.picker = Some(ScenePicker::new(scenes));
        self.overview = None;
        self.step = Step::Generator;
        info!(scenes = count, "moved to prompt picker");
        Ok(count)
    }

    pub fn picker(&self) -> Option<&ScenePicker> {
        self.picker.as_ref()
    }

    pub fn picker_mut(&mut self) -> StoryResult<&mut ScenePicker> {
        self.require(Step::Generator)?;
        self.picker.as_mut().ok_or(StoryError::NoScenes)
    }

    /// Project the picks into overview entries and move on.
    pub fn finish_picking(&mut self) -> StoryResult<()> {
        self.require(Step::Generator)?;
        let picked = self.picker.as_ref().ok_or(StoryError::NoScenes)?.finish()?;
        let overview = SceneOverview::new(picked.into_entries());
        info!(scenes = overview.entries().len(), "moved to scene overview");
        self.overview = Some(overview);
        self.step = Step::Overview;
        Ok(())
    }

    pub fn overview(&self) -> Option<&SceneOverview> {
        self.overview.as_ref()
    }

    pub fn overview_mut(&mut self) -> StoryResult<&mut SceneOverview> {
        self.require(Step::Overview)?;
        self.overview.as_mut().ok_or(StoryError::NoScenes)
    }

    pub async fn generate_scene(&mut self, scene: u32, chain: bool) -> StoryResult<()> {
        let backend = self.backend()?;
        self.require(Step::Overview)?;
        let overview = self.overview.as_mut().ok_or(StoryError::NoScenes)?;
        overview
            .generate_scene(backend.as_ref(), self.form.config(), scene, chain)
            .await
    }

    pub async fn regenerate_scene(&mut self, scene: u32, chain: bool) -> StoryResult<()> {
        let backend = self.backend()?;
        self.require(Step::Overview)?;
        let overview = self.overview.as_mut().ok_or(StoryError::NoScenes)?;
        overview
            .regenerate_scene(backend.as_ref(), self.form.config(), scene, chain)
            .await
    }

    pub async fn generate_all(&mut self, chain: bool) -> StoryResult<GenerateAllReport> {
        let backend = self.backend()?;
        self.require(Step::Overview)?;
        let overview = self.overview.as_mut().ok_or(StoryError::NoScenes)?;
        overview
            .generate_all(backend.as_ref(), self.form.config(), chain)
            .await
    }

    pub fn select_image(&mut self, scene: u32, index: usize) -> StoryResult<&GeneratedImage> {
        self.overview_mut()?.select_image(scene, index)
    }

    pub fn start_sequential(&mut self) -> StoryResult<SequentialStatus> {
        self.backend()?;
        self.overview_mut()?.start_sequential()
    }

    pub async fn sequential_generate(&mut self) -> StoryResult<SequentialStatus> {
        let backend = self.backend()?;
        self.require(Step::Overview)?;
        let overview = self.overview.as_mut().ok_or(StoryError::NoScenes)?;
        overview
            .sequential_generate(backend.as_ref(), self.form.config())
            .await
    }

    pub fn sequential_pick(&mut self, index: usize) -> StoryResult<SequentialStatus> {
        self.overview_mut()?.sequential_pick(index)
    }

    pub fn cancel_sequential(&mut self) -> StoryResult<()> {
        self.overview_mut()?.cancel_sequential();
        Ok(())
    }

    pub fn can_download_all(&self) -> bool {
        self.step == Step::Overview
            && self
                .overview
                .as_ref()
                .is_some_and(SceneOverview::can_download_all)
    }

    pub fn download_all(&self, dir: &Path) -> StoryResult<Vec<PathBuf>> {
        self.require(Step::Overview)?;
        self.overview
            .as_ref()
            .ok_or(StoryError::NoScenes)?
            .download_all(dir)
    }

    /// Generator goes back to the idea form and forgets the scenes; the
    /// overview goes back to the picker with its picks intact.
    pub fn back(&mut self) -> Step {
        self.step = match self.step {
            Step::Idea => Step::Idea,
            Step::Generator => {
                self.picker = None;
                self.overview = None;
                Step::Idea
            }
            Step::Overview => Step::Generator,
        };
        self.step
    }

    /// Reset to an empty idea form. The locale and backend are kept.
    pub fn start_over(&mut self) {
        info!("wizard reset");
        *self = Self {
            locale: self.locale,
            backend: self.backend.take(),
            ..Self::new(None)
        };
    }

    pub fn open_editor(&mut self, target: EditTarget) -> StoryResult<&mut MaskEditor> {
        let image = match target {
            EditTarget::Reference => self
                .form
                .config()
                .reference_image()
                .cloned()
                .ok_or(StoryError::MissingReferenceImage)?,
            EditTarget::Scene(scene) => self
                .overview
                .as_ref()
                .and_then(|o| o.images().selected(scene))
                .map(|g| g.image.clone())
                .ok_or(StoryError::SelectionRequired { scene })?,
        };
        let editor = MaskEditor::open(image)?;
        info!(?target, "editor opened");
        Ok(&mut self.editor.insert((target, editor)).1)
    }

    pub fn editor(&self) -> Option<&MaskEditor> {
        self.editor.as_ref().map(|(_, e)| e)
    }

    pub fn editor_mut(&mut self) -> StoryResult<&mut MaskEditor> {
        self.editor
            .as_mut()
            .map(|(_, e)| e)
            .ok_or(StoryError::EditorClosed)
    }

    pub async fn edit_generate(&mut self, instruction: &str) -> StoryResult<usize> {
        let backend = self.backend()?;
        let editor = self.editor_mut()?;
        Ok(editor.generate(backend.as_ref(), instruction).await?.len())
    }

    /// Accept a candidate and close the editor, writing the image back to
    /// its target.
    pub fn finish_edit(&mut self, index: usize) -> StoryResult<()> {
        let available = self
            .editor()
            .ok_or(StoryError::EditorClosed)?
            .candidates()
            .len();
        if index >= available {
            return Err(StoryError::UnknownEditCandidate { index });
        }
        if let Some((target, _)) = &self.editor {
            self.ensure_target(*target)?;
        }
        let (target, editor) = self.editor.take().ok_or(StoryError::EditorClosed)?;
        let image = editor.accept_and_finish(index)?;
        self.apply_edit(target, image)
    }

    pub fn cancel_edit(&mut self) {
        if let Some((target, editor)) = self.editor.take() {
            info!(?target, "editor closed without changes");
            editor.cancel();
        }
    }

    /// A scene target must still hold a pick for the edit to land on.
    fn ensure_target(&self, target: EditTarget) -> StoryResult<()> {
        match target {
            EditTarget::Reference => Ok(()),
            EditTarget::Scene(scene) => self
                .overview
                .as_ref()
                .and_then(|o| o.images().selected(scene))
                .map(|_| ())
                .ok_or(StoryError::SelectionRequired { scene }),
        }
    }

    fn apply_edit(&mut self, target: EditTarget, image: InlineImage) -> StoryResult<()> {
        match target {
            EditTarget::Reference => {
                self.replace_reference(image);
                Ok(())
            }
            EditTarget::Scene(scene) => self
                .overview
                .as_mut()
                .ok_or(StoryError::NoScenes)?
                .replace_selected_image(scene, image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoType;
    use genai::{MockBackend, MockCall};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn reference() -> UploadedFile {
        let img = RgbaImage::from_pixel(12, 12, Rgba([10, 200, 10, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        UploadedFile {
            name: "ref.png".into(),
            mime_type: "image/png".into(),
            bytes,
        }
    }

    fn wizard() -> (Wizard, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        let mut wizard = Wizard::new(Some(backend.clone()));
        wizard.form_mut().unwrap().set_idea("A robot detective");
        wizard.form_mut().unwrap().set_video_type(VideoType::Loop);
        wizard.attach_reference(&reference()).unwrap();
        (wizard, backend)
    }

    async fn at_overview() -> (Wizard, Arc<MockBackend>) {
        let (mut wizard, backend) = wizard();
        wizard.submit(None).await.unwrap();
        let picker = wizard.picker_mut().unwrap();
        while picker.can_next() {
            picker.next();
        }
        wizard.finish_picking().unwrap();
        (wizard, backend)
    }

    #[tokio::test]
    async fn walks_all_steps_and_back() {
        let (mut wizard, _) = at_overview().await;
        assert_eq!(wizard.step(), Step::Overview);
        assert_eq!(wizard.back(), Step::Generator);
        assert!(wizard.picker().is_some());
        assert_eq!(wizard.back(), Step::Idea);
        assert!(wizard.picker().is_none());
        assert_eq!(wizard.back(), Step::Idea);
    }

    #[tokio::test]
    async fn actions_outside_their_step_are_rejected() {
        let (mut wizard, _) = wizard();
        assert!(matches!(
            wizard.finish_picking(),
            Err(StoryError::WrongStep {
                expected: Step::Generator,
                actual: Step::Idea
            })
        ));
        assert!(wizard.generate_all(false).await.is_err());
    }

    #[tokio::test]
    async fn missing_backend_blocks_generation() {
        let mut wizard = Wizard::new(None);
        wizard.form_mut().unwrap().set_idea("A robot detective");
        wizard.attach_reference(&reference()).unwrap();
        let err = wizard.submit(None).await.unwrap_err();
        assert!(matches!(err, StoryError::MissingCredential(_)));
        assert_eq!(wizard.step(), Step::Idea);
        assert!(wizard.message(&err).contains("GEMINI_API_KEY"));
        assert!(matches!(
            wizard.brainstorm().await,
            Err(StoryError::MissingCredential(_))
        ));
    }

    #[tokio::test]
    async fn reference_edit_clears_generated_images() {
        let (mut wizard, _) = at_overview().await;
        wizard.generate_all(false).await.unwrap();
        assert!(!wizard.overview().unwrap().images().is_empty());

        wizard.open_editor(EditTarget::Reference).unwrap();
        let editor = wizard.editor_mut().unwrap();
        editor.pointer_down(4.0, 4.0);
        editor.pointer_up();
        assert_eq!(wizard.edit_generate("add a hat").await.unwrap(), 2);
        let before = wizard.form().config().reference_image().cloned();
        wizard.finish_edit(0).unwrap();

        assert!(wizard.editor().is_none());
        assert_ne!(wizard.form().config().reference_image().cloned(), before);
        assert!(wizard.overview().unwrap().images().is_empty());
    }

    #[tokio::test]
    async fn scene_edit_replaces_selection_only() {
        let (mut wizard, backend) = at_overview().await;
        wizard.generate_scene(1, false).await.unwrap();
        assert!(matches!(
            wizard.open_editor(EditTarget::Scene(1)),
            Err(StoryError::SelectionRequired { scene: 1 })
        ));
        wizard.select_image(1, 0).unwrap();
        wizard.open_editor(EditTarget::Scene(1)).unwrap();
        wizard.edit_generate("make it rain").await.unwrap();
        let reference = wizard.form().config().reference_image().cloned();
        wizard.finish_edit(1).unwrap();
        assert_eq!(wizard.form().config().reference_image().cloned(), reference);
        assert!(wizard.overview().unwrap().images().selected(1).is_some());
        let edits = backend
            .image_calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Image { instruction, .. } if instruction.contains("make it rain")))
            .count();
        assert_eq!(edits, 2);
    }

    #[tokio::test]
    async fn edit_survives_a_cleared_scene_pick() {
        let (mut wizard, _) = at_overview().await;
        wizard.generate_scene(1, false).await.unwrap();
        wizard.select_image(1, 0).unwrap();
        wizard.open_editor(EditTarget::Scene(1)).unwrap();
        wizard.edit_generate("make it rain").await.unwrap();

        wizard.attach_reference(&reference()).unwrap();
        assert!(matches!(
            wizard.finish_edit(0),
            Err(StoryError::SelectionRequired { scene: 1 })
        ));
        let editor = wizard.editor().expect("editor stays open");
        assert_eq!(editor.candidates().len(), 2);
        assert!(matches!(
            wizard.finish_edit(5),
            Err(StoryError::UnknownEditCandidate { index: 5 })
        ));

        wizard.generate_scene(1, false).await.unwrap();
        wizard.select_image(1, 1).unwrap();
        wizard.finish_edit(0).unwrap();
        assert!(wizard.editor().is_none());
    }

    #[tokio::test]
    async fn cancelled_edit_changes_nothing() {
        let (mut wizard, _) = wizard();
        let before = wizard.form().config().reference_image().cloned();
        wizard.open_editor(EditTarget::Reference).unwrap();
        wizard.cancel_edit();
        assert!(wizard.editor().is_none());
        assert_eq!(wizard.form().config().reference_image().cloned(), before);
        assert!(matches!(wizard.finish_edit(0), Err(StoryError::EditorClosed)));
    }

    #[tokio::test]
    async fn start_over_keeps_locale() {
        let (mut wizard, _) = at_overview().await;
        wizard.set_locale(Locale::Ko);
        wizard.start_over();
        assert_eq!(wizard.step(), Step::Idea);
        assert_eq!(wizard.locale(), Locale::Ko);
        assert!(wizard.has_backend());
        assert!(wizard.form().config().idea.is_empty());
        assert!(!wizard.form().config().has_reference_image());
    }
}
