//! Configuration resolution.
//!
//! Values come from environment variables with fallback to the `env` map in
//! `$HOME/.gitscribe/settings.json`, and CLI flags override both. The rest
//! of the crate consumes the resolved [`Config`] and never reads environment
//! variables or files itself.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default token limit for generated output.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Settings loaded from `$HOME/.gitscribe/settings.json`.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Environment variable overrides.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self> {
        let settings_path = Self::settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Settings {
                env: HashMap::new(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str::<Settings>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn settings_path() -> Result<PathBuf> {
        Ok(dot_dir()?.join("settings.json"))
    }
}

/// Returns the `$HOME/.gitscribe` directory path.
pub fn dot_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home_dir.join(".gitscribe"))
}

/// Returns an environment variable with fallback to settings.
pub fn get_env_var(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(_) => match Settings::load() {
            Ok(settings) => settings
                .env
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Environment variable not found: {}", key)),
            Err(err) => {
                Err(anyhow::anyhow!("Environment variable not found: {}", key).context(err))
            }
        },
    }
}

/// Tries multiple environment variables with fallback to settings.
pub fn get_env_vars(keys: &[&str]) -> Result<String> {
    for key in keys {
        if let Ok(value) = get_env_var(key) {
            return Ok(value);
        }
    }

    Err(anyhow::anyhow!(
        "None of the environment variables found: {:?}",
        keys
    ))
}

/// Resolved configuration consumed by the generation core.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the generation endpoint.
    pub api_key: String,
    /// Base URL of the endpoint.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Model substituted on rate limits.
    pub fallback_model: Option<String>,
    /// Token limit for generated output.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Reasoning-effort hint for models that accept one.
    pub reasoning_effort: Option<String>,
    /// Output language for generated text.
    pub language: Option<String>,
    /// Whether to use the streaming response mode.
    pub stream: bool,
    /// Suppresses progress output.
    pub quiet: bool,
}

impl Config {
    /// Resolves configuration from environment and settings, applying CLI
    /// overrides.
    pub fn resolve(
        model_override: Option<&str>,
        language_override: Option<&str>,
        stream: bool,
        quiet: bool,
    ) -> Result<Self> {
        let api_key = get_env_vars(&["GITSCRIBE_API_KEY", "OPENAI_API_KEY"]).context(
            "API key not found. Set GITSCRIBE_API_KEY or OPENAI_API_KEY, \
             or add it to ~/.gitscribe/settings.json",
        )?;

        let base_url =
            get_env_var("GITSCRIBE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .with_context(|| format!("Invalid GITSCRIBE_BASE_URL: {base_url}"))?;

        let model = match model_override {
            Some(model) => model.to_string(),
            None => get_env_var("GITSCRIBE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        };

        let fallback_model = get_env_var("GITSCRIBE_FALLBACK_MODEL").ok();

        let max_tokens = match get_env_var("GITSCRIBE_MAX_TOKENS") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("Invalid GITSCRIBE_MAX_TOKENS: {raw}"))?,
            Err(_) => DEFAULT_MAX_TOKENS,
        };

        let temperature = match get_env_var("GITSCRIBE_TEMPERATURE") {
            Ok(raw) => Some(
                raw.parse::<f32>()
                    .with_context(|| format!("Invalid GITSCRIBE_TEMPERATURE: {raw}"))?,
            ),
            Err(_) => None,
        };

        let reasoning_effort = get_env_var("GITSCRIBE_REASONING_EFFORT").ok();

        let language = match language_override {
            Some(language) => Some(language.to_string()),
            None => get_env_var("GITSCRIBE_LANGUAGE").ok(),
        };

        Ok(Config {
            api_key,
            base_url,
            model,
            fallback_model,
            max_tokens,
            temperature,
            reasoning_effort,
            language,
            stream,
            quiet,
        })
    }

    /// A configuration with placeholder credentials, for tests.
    #[doc(hidden)]
    pub fn for_tests() -> Self {
        Config {
            api_key: "test-key".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "scribe-large".to_string(),
            fallback_model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            reasoning_effort: None,
            language: None,
            stream: false,
            quiet: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn settings_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");

        let settings_json = r#"{
            "env": {
                "TEST_VAR": "test_value",
                "GITSCRIBE_API_KEY": "test_api_key"
            }
        }"#;
        fs::write(&settings_path, settings_json).unwrap();

        let settings = Settings::load_from_path(&settings_path).unwrap();

        assert_eq!(settings.env.get("TEST_VAR").unwrap(), "test_value");
        assert_eq!(
            settings.env.get("GITSCRIBE_API_KEY").unwrap(),
            "test_api_key"
        );
    }

    #[test]
    fn settings_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(temp_dir.path().join("absent.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn settings_rejects_malformed_json() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        fs::write(&settings_path, "{not json").unwrap();
        assert!(Settings::load_from_path(&settings_path).is_err());
    }
}
