//! JSON configuration file for the CLI.

use crate::backend::HttpTranslator;
use anyhow::{Context, Result};
use ppt_translate_core::{LanguagePair, TranslateConfig, TranslatorRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/translate";

/// One HTTP translate service serving a language pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub source: String,
    pub target: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl BackendConfig {
    fn new(source: &str, target: &str, endpoint: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            endpoint: endpoint.to_string(),
            model: None,
        }
    }

    fn pair(&self) -> Result<LanguagePair> {
        LanguagePair::new(&self.source, &self.target)
            .with_context(|| format!("Invalid backend languages {} -> {}", self.source, self.target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub translate: TranslateConfig,
    pub backends: Vec<BackendConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            translate: TranslateConfig::default(),
            backends: vec![
                BackendConfig::new("en", "ru", DEFAULT_ENDPOINT),
                BackendConfig::new("ru", "en", DEFAULT_ENDPOINT),
            ],
        }
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Point the backend for `pair` at `endpoint`, adding one if none is configured.
    pub fn set_endpoint(&mut self, pair: &LanguagePair, endpoint: &str) -> Result<()> {
        for backend in &mut self.backends {
            if backend.pair()? == *pair {
                backend.endpoint = endpoint.to_string();
                return Ok(());
            }
        }
        self.backends
            .push(BackendConfig::new(&pair.source, &pair.target, endpoint));
        Ok(())
    }

    /// One HTTP capability per configured backend. Later entries for the same
    /// pair replace earlier ones.
    pub fn registry(&self) -> Result<TranslatorRegistry> {
        let timeout = self.translate.call_timeout();

        let mut registry = TranslatorRegistry::new();
        for backend in &self.backends {
            let pair = backend.pair()?;
            log::debug!("Backend {} at {}", pair, backend.endpoint);
            let translator =
                HttpTranslator::new(&backend.endpoint, pair.clone(), backend.model.clone(), timeout)?;
            registry.register(pair, translator);
        }
        Ok(registry)
    }
}
