//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{LlmConfigResponse, LlmConfigUpdate, LlmProvider};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Stored LLM configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            config_path: PathBuf::new(),
        }
    }
}

impl LlmConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LlmConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for API keys
        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Apply an update, merging with existing config.
    pub fn apply_update(&mut self, update: &LlmConfigUpdate) {
        if let Some(p) = &update.preferred_provider {
            self.preferred_provider = p.clone();
        }
        if let Some(k) = &update.openai_api_key {
            self.openai_api_key = Some(k.clone());
        }
        if let Some(k) = &update.anthropic_api_key {
            self.anthropic_api_key = Some(k.clone());
        }
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
    }

    /// Resolve which provider, model, and key to use.
    pub fn resolve_provider(&self) -> Option<(LlmProvider, String, String)> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "openai" => self
                    .openai_api_key
                    .as_ref()
                    .map(|k| (LlmProvider::OpenAI, self.openai_model.clone(), k.clone())),
                "anthropic" => self.anthropic_api_key.as_ref().map(|k| {
                    (LlmProvider::Anthropic, self.anthropic_model.clone(), k.clone())
                }),
                _ => None,
            };
        }

        // Auto mode: Anthropic > OpenAI
        if let Some(k) = &self.anthropic_api_key {
            return Some((LlmProvider::Anthropic, self.anthropic_model.clone(), k.clone()));
        }
        if let Some(k) = &self.openai_api_key {
            return Some((LlmProvider::OpenAI, self.openai_model.clone(), k.clone()));
        }

        None
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LlmConfigResponse {
        let resolved = self.resolve_provider();
        LlmConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            active_provider: resolved.map(|(p, _, _)| p.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = LlmConfig::load(&dir.path().join("llm-config.json"));
        assert_eq!(config.preferred_provider, "auto");
        assert_eq!(config.anthropic_model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm-config.json");

        let mut config = LlmConfig::load(&path);
        config.anthropic_api_key = Some("sk-test".to_string());
        config.preferred_provider = "anthropic".to_string();
        config.save().unwrap();

        let reloaded = LlmConfig::load(&path);
        assert_eq!(reloaded.preferred_provider, "anthropic");
        assert_eq!(reloaded.anthropic_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_resolve_prefers_anthropic_in_auto() {
        let mut config = LlmConfig::default();
        config.openai_api_key = Some("openai-key".to_string());
        config.anthropic_api_key = Some("anthropic-key".to_string());

        let (provider, _, key) = config.resolve_provider().unwrap();
        assert_eq!(provider, LlmProvider::Anthropic);
        assert_eq!(key, "anthropic-key");
    }

    #[test]
    fn test_resolve_explicit_preference_without_key() {
        let mut config = LlmConfig::default();
        config.preferred_provider = "openai".to_string();
        config.anthropic_api_key = Some("anthropic-key".to_string());
        // Preference names a provider with no key configured
        assert!(config.resolve_provider().is_none());
    }

    #[test]
    fn test_response_masks_keys() {
        let mut config = LlmConfig::default();
        config.anthropic_api_key = Some("secret".to_string());
        let response = config.to_response();
        assert!(response.anthropic_configured);
        assert_eq!(response.active_provider.as_deref(), Some("anthropic"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret"));
    }
}
