use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// One prompt variant, written in English and Korean.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub ko: String,
}

impl BilingualText {
    pub fn new(en: impl Into<String>, ko: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ko: ko.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.en.trim().is_empty() && self.ko.trim().is_empty()
    }

    /// English text, or the Korean text when the English one is blank.
    pub fn primary(&self) -> &str {
        if self.en.trim().is_empty() {
            &self.ko
        } else {
            &self.en
        }
    }
}

/// Base64 image payload as exchanged with the generation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.data.as_bytes())
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One entry of the structured scene response.
///
/// Every field is optional on the wire so a partially malformed entry still
/// yields a scene instead of failing the whole response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDraft {
    #[serde(default, alias = "scene_number")]
    pub scene_number: Option<u32>,
    #[serde(default)]
    pub story: String,
    #[serde(default, alias = "image_prompts")]
    pub image_prompts: Vec<BilingualText>,
    #[serde(default, alias = "video_prompts")]
    pub video_prompts: Vec<BilingualText>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneRequest {
    pub instructions: String,
    pub reference: Option<InlineImage>,
}

/// Images are sent in order, followed by the instruction text.
#[derive(Clone, Debug, Default)]
pub struct ImageRequest {
    pub images: Vec<InlineImage>,
    pub instruction: String,
}
