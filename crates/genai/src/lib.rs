//! Generative AI collaborator for storyboard generation.
//!
//! Provides a single backend abstraction over text, structured scene and
//! image generation, a Gemini HTTP implementation and a scripted mock.

mod backend;
mod error;
pub mod gemini;
pub mod mock;
mod models;
mod schema;

pub use backend::{BackendKind, GenerativeBackend};
pub use error::ProviderError;
pub use gemini::{GeminiBackend, GeminiConfig, GEMINI_API_BASE};
pub use mock::{MockBackend, MockCall, MockConfig, MockImageOutcome};
pub use models::{BilingualText, ImageRequest, InlineImage, SceneDraft, SceneRequest};
pub use schema::{scene_response_schema, strip_code_fence};
