use genai::ProviderError;
use thiserror::Error;

use crate::wizard::Step;

/// Every failure a storyboard action can report.
///
/// Validation errors are re-enterable; external-call errors leave the state
/// that triggered them as it was before the call.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("story idea is empty")]
    EmptyIdea,
    #[error("a reference image is required")]
    MissingReferenceImage,
    #[error("unsupported file type '{mime_type}'")]
    UnsupportedFileType { mime_type: String },
    #[error("file is {size} bytes, the limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },
    #[error("generation service is not configured: {0}")]
    MissingCredential(String),
    #[error("brainstorm failed: {0}")]
    BrainstormFailed(#[source] ProviderError),
    #[error("scene generation failed: {0}")]
    SceneGenerationFailed(#[source] ProviderError),
    #[error("no image was generated for scene {scene}")]
    NoImageReturned { scene: u32 },
    #[error("edit instruction is empty")]
    EmptyInstruction,
    #[error("image edit returned no result")]
    EditFailed,
    #[error("edit candidate {index} does not exist")]
    UnknownEditCandidate { index: usize },
    #[error("scene {0} does not exist")]
    UnknownScene(u32),
    #[error("candidate {index} does not exist for scene {scene}")]
    UnknownCandidate { scene: u32, index: usize },
    #[error("scene {scene} needs a selected image before continuing")]
    SelectionRequired { scene: u32 },
    #[error("scene list is empty")]
    NoScenes,
    #[error("finish is only available on the last scene")]
    PickerIncomplete,
    #[error("no sequential run is active")]
    NoSequentialRun,
    #[error("a sequential run is in progress; finish or cancel it first")]
    SequentialRunActive,
    #[error("action needs the {expected:?} step, wizard is at {actual:?}")]
    WrongStep { expected: Step, actual: Step },
    #[error("the image editor is not open")]
    EditorClosed,
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoryError {
    /// Wrap a provider failure, surfacing credential problems as setup errors.
    pub fn from_provider(err: ProviderError, wrap: fn(ProviderError) -> StoryError) -> Self {
        match err {
            ProviderError::Configuration(msg) => StoryError::MissingCredential(msg),
            other => wrap(other),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoryError::EmptyIdea
                | StoryError::EmptyInstruction
                | StoryError::MissingReferenceImage
                | StoryError::UnsupportedFileType { .. }
                | StoryError::FileTooLarge { .. }
        )
    }

    /// Translation key for the user-facing message.
    pub fn message_key(&self) -> &'static str {
        match self {
            StoryError::EmptyIdea => "error.empty_idea",
            StoryError::MissingReferenceImage => "error.missing_reference",
            StoryError::UnsupportedFileType { .. } => "error.file_type",
            StoryError::FileTooLarge { .. } => "error.file_size",
            StoryError::MissingCredential(_) => "error.missing_credential",
            StoryError::BrainstormFailed(_) => "error.brainstorm_failed",
            StoryError::SceneGenerationFailed(_) => "error.scene_generation_failed",
            StoryError::NoImageReturned { .. } => "error.image_generation_failed",
            StoryError::EmptyInstruction => "error.empty_instruction",
            StoryError::EditFailed => "error.edit_failed",
            StoryError::SelectionRequired { .. } => "error.selection_required",
            StoryError::NoScenes => "error.no_scenes",
            StoryError::SequentialRunActive => "error.sequential_active",
            _ => "error.generic",
        }
    }
}

pub type StoryResult<T> = Result<T, StoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_become_setup_errors() {
        let err = StoryError::from_provider(
            ProviderError::configuration("GEMINI_API_KEY is not set"),
            StoryError::BrainstormFailed,
        );
        assert!(matches!(err, StoryError::MissingCredential(_)));
        assert_eq!(err.message_key(), "error.missing_credential");

        let err = StoryError::from_provider(
            ProviderError::transport("offline"),
            StoryError::SceneGenerationFailed,
        );
        assert!(matches!(err, StoryError::SceneGenerationFailed(_)));
    }

    #[test]
    fn validation_classification() {
        assert!(StoryError::EmptyIdea.is_validation());
        assert!(StoryError::FileTooLarge { size: 2, limit: 1 }.is_validation());
        assert!(!StoryError::EditFailed.is_validation());
    }
}
