use anyhow::{Context, Result};
use genai::gemini::API_KEY_ENV;
use genai::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyboard::Locale;

pub const CONFIG_DIR: &str = "storyframe";
pub const CONFIG_FILE: &str = "config.json";
const LOCALE_ENV: &str = "STORYFRAME_LOCALE";

/// Settings layered as: config file, then environment, then flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api_key: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub api_base: Option<String>,
    pub temperature: Option<f32>,
    pub locale: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub mock: bool,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

impl CliConfig {
    /// Missing files are not an error; malformed ones are.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty("API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(locale) = non_empty(LOCALE_ENV) {
            self.locale = Some(locale);
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
            .as_deref()
            .and_then(Locale::parse)
            .unwrap_or_default()
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        let mut config = GeminiConfig::default();
        if let Some(key) = &self.api_key {
            config.api_key = key.clone();
        }
        if let Some(model) = &self.text_model {
            config.text_model = model.clone();
        }
        if let Some(model) = &self.image_model {
            config.image_model = model.clone();
        }
        if let Some(base) = &self.api_base {
            config.api_base = base.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.locale(), Locale::En);
    }

    #[test]
    fn file_values_feed_gemini_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"api_key": "file-key", "image_model": "custom-image", "locale": "ko"}"#,
        )
        .unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.locale(), Locale::Ko);
        let gemini = config.gemini_config();
        assert_eq!(gemini.api_key, "file-key");
        assert_eq!(gemini.image_model, "custom-image");
        assert_eq!(gemini.text_model, GeminiConfig::default().text_model);
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = CliConfig {
            api_key: Some("file-key".into()),
            ..CliConfig::default()
        };
        config.apply_vars(|name| match name {
            "API_KEY" => Some("fallback-key".into()),
            "STORYFRAME_LOCALE" => Some("ko".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("fallback-key"));
        assert_eq!(config.locale(), Locale::Ko);

        config.apply_vars(|name| (name == API_KEY_ENV).then(|| "  ".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("fallback-key"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
