//! Configuration for synchronization runs
//!
//! Loaded from TOML; every section is optional and falls back to defaults:
//!
//! ```toml
//! [api]
//! url = "https://engine.internal"
//! key = "api_..."
//! timeout_secs = 30
//! token_prefixes = ["api_"]
//!
//! [normalizer]
//! grammar = "printf"   # or "named"
//!
//! [chunking]
//! max_bytes = 4096
//! max_entries = 250
//!
//! [orchestrator]
//! concurrency = 4
//! ```
//!
//! `BANANA_SYNC_API_KEY` and `BANANA_SYNC_API_URL` override the file.

use std::path::Path;

use serde::Deserialize;

use crate::sync::chunk::ChunkPolicy;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::grammar::VariableGrammar;
use crate::sync::normalizer::VariableNormalizer;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub normalizer: NormalizerConfig,
    pub chunking: ChunkPolicy,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub timeout_secs: u64,
    pub token_prefixes: Vec<String>,
}

impl ApiConfig {
    pub const KEY_ENV: &'static str = "BANANA_SYNC_API_KEY";
    pub const URL_ENV: &'static str = "BANANA_SYNC_API_URL";

    /// Override url and key from the environment, via `lookup` so callers and tests
    /// can supply their own source.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(Self::KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.key = Some(key);
        }
        if let Some(url) = lookup(Self::URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.url = Some(url);
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            url: None,
            key: None,
            timeout_secs: 30,
            token_prefixes: vec!["api_".to_string()],
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("token_prefixes", &self.token_prefixes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Grammar identifier, see [`VariableGrammar`]
    pub grammar: String,
}

impl NormalizerConfig {
    pub fn build(&self) -> SyncResult<VariableNormalizer> {
        VariableNormalizer::from_identifier(&self.grammar)
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            grammar: VariableGrammar::Printf.identifier().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Target locales processed at the same time
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig { concurrency: 4 }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> SyncResult<Self> {
        let config: SyncConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Apply `BANANA_SYNC_*` overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        self.api.apply_env(|name| std::env::var(name).ok());
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        self.normalizer.grammar.parse::<VariableGrammar>()?;
        self.chunking.validate()?;
        if self.orchestrator.concurrency == 0 {
            return Err(SyncError::Configuration(
                "orchestrator.concurrency must be at least 1".to_string(),
            ));
        }
        if self.api.token_prefixes.is_empty() {
            return Err(SyncError::Configuration(
                "api.token_prefixes cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.normalizer.grammar, "printf");
        assert_eq!(config.chunking, ChunkPolicy::default());
        assert_eq!(config.orchestrator.concurrency, 4);
        assert_eq!(config.api.token_prefixes, vec!["api_"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = SyncConfig::from_toml_str(
            r#"
            [api]
            url = "https://engine.test"
            key = "api_abc"
            timeout_secs = 5

            [normalizer]
            grammar = "named"

            [chunking]
            max_bytes = 1024

            [orchestrator]
            concurrency = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.api.url.as_deref(), Some("https://engine.test"));
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.normalizer.build().unwrap().grammar(), VariableGrammar::Named);
        assert_eq!(config.chunking.max_bytes, 1024);
        assert_eq!(config.chunking.max_entries, ChunkPolicy::DEFAULT_MAX_ENTRIES);
        assert_eq!(config.orchestrator.concurrency, 2);
    }

    #[test]
    fn test_unknown_grammar_fails_validation() {
        let result = SyncConfig::from_toml_str("[normalizer]\ngrammar = \"fluent\"\n");
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_zero_concurrency_fails_validation() {
        let result = SyncConfig::from_toml_str("[orchestrator]\nconcurrency = 0\n");
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = SyncConfig::from_toml_str("[chunking\nmax_bytes = ");
        assert!(matches!(result, Err(SyncError::Toml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ApiConfig::KEY_ENV, "api_from_env"),
            (ApiConfig::URL_ENV, "https://env.engine"),
        ]);
        let mut api = ApiConfig {
            key: Some("api_from_file".to_string()),
            ..ApiConfig::default()
        };

        api.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(api.key.as_deref(), Some("api_from_env"));
        assert_eq!(api.url.as_deref(), Some("https://env.engine"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut api = ApiConfig {
            key: Some("api_keep".to_string()),
            ..ApiConfig::default()
        };
        api.apply_env(|_| Some("  ".to_string()));
        assert_eq!(api.key.as_deref(), Some("api_keep"));
    }

    #[test]
    fn test_debug_masks_key() {
        let api = ApiConfig {
            key: Some("api_secret".to_string()),
            ..ApiConfig::default()
        };
        let debug_str = format!("{:?}", api);
        assert!(!debug_str.contains("api_secret"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chunking]\nmax_entries = 10").unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(config.chunking.max_entries, 10);
    }
}
