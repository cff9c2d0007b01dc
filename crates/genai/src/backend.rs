use crate::error::ProviderError;
use crate::models::{ImageRequest, InlineImage, SceneDraft, SceneRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Gemini,
    Mock,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Generation service used by every storyboard step.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Free-form text completion.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Structured scene list constrained by [`crate::scene_response_schema`].
    async fn generate_scenes(&self, request: &SceneRequest)
        -> Result<Vec<SceneDraft>, ProviderError>;

    /// Image generation or edit. `Ok(None)` means the call succeeded but the
    /// service returned no image.
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Option<InlineImage>, ProviderError>;
}
