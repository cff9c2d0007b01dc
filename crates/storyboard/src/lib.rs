//! Storyboard wizard: idea intake, per-scene prompt picking, candidate image
//! generation (bulk or sequential) and mask-based image editing.
//!
//! Every step is a typed call on [`Wizard`]; front ends only render state and
//! forward user actions.

pub mod config;
pub mod error;
pub mod export;
pub mod i18n;
pub mod images;
pub mod intake;
pub mod mask;
pub mod overview;
pub mod picker;
pub mod progress;
pub mod prompts;
pub mod scene;
pub mod sequential;
pub mod wizard;

pub use config::{ImageStyle, StoryConfiguration, StoryStyle, VideoLength, VideoType};
pub use error::{StoryError, StoryResult};
pub use i18n::{tr, Locale};
pub use images::{GeneratedImage, GeneratedImageSet};
pub use intake::{IdeaForm, UploadedFile, MAX_UPLOAD_BYTES};
pub use mask::{BrushMode, MaskEditor};
pub use overview::{GenerateAllReport, SceneOverview};
pub use picker::{PickedPrompts, ScenePicker};
pub use scene::{PromptAxis, PromptChoice, Scene, SceneOverviewEntry};
pub use sequential::SequentialStatus;
pub use wizard::{EditTarget, Step, Wizard};
