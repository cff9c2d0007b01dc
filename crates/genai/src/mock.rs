use crate::backend::{BackendKind, GenerativeBackend};
use crate::error::ProviderError;
use crate::models::{BilingualText, ImageRequest, InlineImage, SceneDraft, SceneRequest};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;

/// What the next image call returns.
#[derive(Clone, Debug)]
pub enum MockImageOutcome {
    Image,
    Empty,
    Error(String),
}

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    pub text_reply: Option<String>,
    pub fail_text: bool,
    pub scenes: Option<Vec<SceneDraft>>,
    pub fail_scenes: bool,
    /// Consumed one per image call; an empty queue yields an image.
    pub image_outcomes: Vec<MockImageOutcome>,
}

/// Recorded call, in issue order.
#[derive(Clone, Debug, PartialEq)]
pub enum MockCall {
    Text {
        prompt: String,
    },
    Scenes {
        instructions: String,
        has_reference: bool,
    },
    Image {
        instruction: String,
        image_count: usize,
    },
}

pub struct MockBackend {
    config: MockConfig,
    image_outcomes: Mutex<VecDeque<MockImageOutcome>>,
    calls: Mutex<Vec<MockCall>>,
    images_served: Mutex<u32>,
}

impl MockBackend {
    pub fn new(config: MockConfig) -> Self {
        let outcomes = VecDeque::from(config.image_outcomes.clone());
        Self {
            config,
            image_outcomes: Mutex::new(outcomes),
            calls: Mutex::new(Vec::new()),
            images_served: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn image_calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, MockCall::Image { .. }))
            .cloned()
            .collect()
    }

    /// Push more image outcomes after construction.
    pub fn queue_image_outcomes(&self, outcomes: impl IntoIterator<Item = MockImageOutcome>) {
        self.image_outcomes.lock().extend(outcomes);
    }

    /// Three scenes with both prompt axes fully populated.
    pub fn default_scenes() -> Vec<SceneDraft> {
        (1..=3)
            .map(|n| SceneDraft {
                scene_number: Some(n),
                story: format!("Scene {n} of the mock story."),
                image_prompts: vec![
                    BilingualText::new(format!("Wide shot, scene {n}"), format!("와이드 샷, 장면 {n}")),
                    BilingualText::new(format!("Close-up, scene {n}"), format!("클로즈업, 장면 {n}")),
                ],
                video_prompts: vec![
                    BilingualText::new(format!("Slow pan, scene {n}"), format!("느린 팬, 장면 {n}")),
                    BilingualText::new(format!("Dolly in, scene {n}"), format!("달리 인, 장면 {n}")),
                ],
            })
            .collect()
    }

    fn placeholder_image(&self) -> Result<InlineImage, ProviderError> {
        let serial = {
            let mut served = self.images_served.lock();
            *served += 1;
            *served
        };
        let shade = (serial.wrapping_mul(37) % 256) as u8;
        let img = RgbaImage::from_pixel(8, 8, Rgba([shade, 255 - shade, 128, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| ProviderError::Other(format!("mock image encode failed: {err}")))?;
        Ok(InlineImage::from_bytes("image/png", &bytes))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.lock().push(MockCall::Text {
            prompt: prompt.to_string(),
        });
        if self.config.fail_text {
            return Err(ProviderError::transport("mock text failure"));
        }
        Ok(self.config.text_reply.clone().unwrap_or_else(|| {
            "On a rain-soaked night, a small robot detective follows a trail of glowing footprints."
                .to_string()
        }))
    }

    async fn generate_scenes(
        &self,
        request: &SceneRequest,
    ) -> Result<Vec<SceneDraft>, ProviderError> {
        self.calls.lock().push(MockCall::Scenes {
            instructions: request.instructions.clone(),
            has_reference: request.reference.is_some(),
        });
        if self.config.fail_scenes {
            return Err(ProviderError::invalid_response("mock scene failure"));
        }
        Ok(self
            .config
            .scenes
            .clone()
            .unwrap_or_else(Self::default_scenes))
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Option<InlineImage>, ProviderError> {
        self.calls.lock().push(MockCall::Image {
            instruction: request.instruction.clone(),
            image_count: request.images.len(),
        });
        let outcome = self
            .image_outcomes
            .lock()
            .pop_front()
            .unwrap_or(MockImageOutcome::Image);
        match outcome {
            MockImageOutcome::Image => self.placeholder_image().map(Some),
            MockImageOutcome::Empty => Ok(None),
            MockImageOutcome::Error(msg) => Err(ProviderError::transport(msg)),
        }
    }
}
