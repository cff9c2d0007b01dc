use crate::backend::{BackendKind, GenerativeBackend};
use crate::error::ProviderError;
use crate::models::{ImageRequest, InlineImage, SceneDraft, SceneRequest};
use crate::schema::{scene_response_schema, strip_code_fence};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const FALLBACK_API_KEY_ENV: &str = "API_KEY";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub temperature: f32,
    pub api_base: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image-preview".to_string(),
            temperature: 0.8,
            api_base: GEMINI_API_BASE.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Read the credential from `GEMINI_API_KEY` (or `API_KEY`).
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = [API_KEY_ENV, FALLBACK_API_KEY_ENV]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::configuration(format!(
                    "{API_KEY_ENV} is not set. Export your Gemini API key before generating."
                ))
            })?;
        Ok(Self {
            api_key,
            ..Self::default()
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }
}

pub struct GeminiBackend {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::configuration(format!(
                "Gemini API key is required. Set {API_KEY_ENV}."
            )));
        }
        if config.text_model.trim().is_empty() || config.image_model.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Gemini model name is required.",
            ));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model.trim()
        )
    }

    async fn execute(&self, model: &str, payload: Value) -> Result<GeminiResponse, ProviderError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(&payload)
            .send()
            .await
            .map_err(|err| ProviderError::transport(format!("Gemini request failed: {err}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            ProviderError::transport(format!("Read Gemini response failed: {err}"))
        })?;
        debug!(
            model,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "gemini call finished"
        );
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }
        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|err| {
            ProviderError::invalid_response(format!("Invalid Gemini response JSON: {err}"))
        })?;
        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "gemini usage"
            );
        }
        Ok(parsed)
    }
}

fn inline_part(image: &InlineImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data,
        }
    })
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.config.temperature },
        });
        let response = self.execute(&self.config.text_model, payload).await?;
        let text = response.first_text();
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_response(
                "Gemini returned an empty text response.",
            ));
        }
        Ok(text)
    }

    async fn generate_scenes(
        &self,
        request: &SceneRequest,
    ) -> Result<Vec<SceneDraft>, ProviderError> {
        let mut parts = Vec::new();
        if let Some(reference) = &request.reference {
            parts.push(inline_part(reference));
        }
        parts.push(json!({ "text": request.instructions }));
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "responseMimeType": "application/json",
                "responseSchema": scene_response_schema(),
            },
        });
        let response = self.execute(&self.config.text_model, payload).await?;
        let text = response.first_text();
        serde_json::from_str(strip_code_fence(&text)).map_err(|err| {
            ProviderError::invalid_response(format!("Scene response is not a scene array: {err}"))
        })
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Option<InlineImage>, ProviderError> {
        let mut parts: Vec<Value> = request.images.iter().map(inline_part).collect();
        parts.push(json!({ "text": request.instruction }));
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] },
        });
        let response = self.execute(&self.config.image_model, payload).await?;
        let image = response.first_image();
        if image.is_none() {
            warn!(
                finish_reason = response.finish_reason().unwrap_or("unknown"),
                "gemini image call returned no inline image"
            );
        }
        Ok(image)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &GeminiPart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .into_iter()
            .flatten()
    }

    fn first_text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn first_image(&self) -> Option<InlineImage> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|data| !data.data.is_empty())
            .map(|data| InlineImage {
                mime_type: data
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
                data: data.data.clone(),
            })
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}
