use genai::{GenerativeBackend, InlineImage, SceneRequest};
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{ImageStyle, StoryConfiguration, StoryStyle, VideoLength, VideoType};
use crate::error::{StoryError, StoryResult};
use crate::progress;
use crate::prompts;
use crate::scene::{scenes_from_drafts, Scene};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

/// A file handed over by the picker or drag-and-drop layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Read a file from disk, deriving the MIME type from its extension.
    pub fn from_path(path: &Path) -> StoryResult<Self> {
        let mime_type = image::ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }
}

pub fn validate_upload(file: &UploadedFile) -> StoryResult<()> {
    let mime = file.mime_type.trim().to_ascii_lowercase();
    if !ACCEPTED_IMAGE_TYPES.contains(&mime.as_str()) {
        return Err(StoryError::UnsupportedFileType {
            mime_type: file.mime_type.clone(),
        });
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(StoryError::FileTooLarge {
            size: file.bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Validate an upload and encode it for the generation service.
pub fn encode_upload(file: &UploadedFile) -> StoryResult<InlineImage> {
    validate_upload(file)?;
    Ok(InlineImage::from_bytes(
        file.mime_type.trim().to_ascii_lowercase(),
        &file.bytes,
    ))
}

#[derive(Debug, Clone, Default)]
pub struct IdeaForm {
    config: StoryConfiguration,
}

impl IdeaForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &StoryConfiguration {
        &self.config
    }

    pub fn set_idea(&mut self, idea: impl Into<String>) {
        self.config.idea = idea.into();
    }

    pub fn set_story_style(&mut self, style: StoryStyle) {
        self.config.story_style = style;
    }

    pub fn set_image_style(&mut self, style: ImageStyle) {
        self.config.image_style = style;
    }

    pub fn set_video_type(&mut self, video_type: VideoType) {
        self.config.video_type = video_type;
    }

    pub fn set_video_length(&mut self, length: VideoLength) {
        self.config.video_length = length;
    }

    /// Rejected uploads leave the current reference untouched.
    pub fn attach_reference(&mut self, file: &UploadedFile) -> StoryResult<()> {
        let encoded = encode_upload(file)?;
        info!(name = %file.name, bytes = file.bytes.len(), "reference image attached");
        self.config.set_reference_image(encoded);
        Ok(())
    }

    pub(crate) fn replace_reference(&mut self, image: InlineImage) {
        self.config.set_reference_image(image);
    }

    /// Rewrite (or invent, when empty) the idea. On failure the idea stays.
    pub async fn brainstorm(&mut self, backend: &dyn GenerativeBackend) -> StoryResult<&str> {
        let prompt = prompts::brainstorm_prompt(&self.config.idea, self.config.story_style);
        match backend.generate_text(&prompt).await {
            Ok(text) => {
                self.config.idea = text;
                Ok(&self.config.idea)
            }
            Err(err) => {
                warn!(error = %err, "brainstorm failed");
                Err(StoryError::from_provider(err, StoryError::BrainstormFailed))
            }
        }
    }

    pub fn validate_submission(&self) -> StoryResult<()> {
        if self.config.idea.trim().is_empty() {
            return Err(StoryError::EmptyIdea);
        }
        if !self.config.has_reference_image() {
            return Err(StoryError::MissingReferenceImage);
        }
        Ok(())
    }

    /// Request the scene list. `progress` receives simulated percentages
    /// while the request is in flight.
    pub async fn submit(
        &self,
        backend: &dyn GenerativeBackend,
        progress: Option<&watch::Sender<u8>>,
    ) -> StoryResult<Vec<Scene>> {
        self.validate_submission()?;
        let request = SceneRequest {
            instructions: prompts::scene_instructions(&self.config),
            reference: self.config.reference_image().cloned(),
        };
        let call = backend.generate_scenes(&request);
        let result = match progress {
            Some(tx) => progress::track(call, self.config.estimated_generation_time(), tx).await,
            None => call.await,
        };
        let drafts = result.map_err(|err| {
            warn!(error = %err, "scene generation failed");
            StoryError::from_provider(err, StoryError::SceneGenerationFailed)
        })?;
        let max = *self.config.scene_count_range().end();
        let scenes = scenes_from_drafts(drafts, max);
        info!(count = scenes.len(), "scenes generated");
        Ok(scenes)
    }
}
