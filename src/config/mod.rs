//! Configuration management for Risposta
//!
//! Typed configuration with TOML loading, environment overrides and
//! validation. Domain vocabulary lives here as data so it can grow without
//! touching retrieval logic.

use crate::context::ContextLimits;
use crate::error::{Result, RispostaError};
use crate::retrieval::{ChannelLimits, FusionWeights};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;
mod vocabulary;

pub use crate::cache::CacheConfig;
pub use crate::embedding::EmbeddingConfig;
pub use validator::ConfigValidator;
pub use vocabulary::Vocabulary;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub fusion: FusionWeights,
    #[serde(default)]
    pub context: ContextLimits,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sparse_index: SparseIndexConfig,
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

/// Candidate-pool sizing for retrieval, fusion and reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Fusion keeps `max(k * fused_pool_multiplier, fused_pool_floor)`
    /// candidates for the reranker to work with
    pub fused_pool_multiplier: usize,
    pub fused_pool_floor: usize,
    /// The reranker reorders the fused top `k * rerank_multiplier`
    pub rerank_multiplier: usize,
    #[serde(default)]
    pub channels: ChannelLimits,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fused_pool_multiplier: 10,
            fused_pool_floor: 50,
            rerank_multiplier: 3,
            channels: ChannelLimits::default(),
        }
    }
}

/// Cross-encoder reranker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub model: String,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "Xenova/ms-marco-MiniLM-L-6-v2".to_string(),
        }
    }
}

/// Generation collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemma2:2b".to_string(),
            max_tokens: 250,
        }
    }
}

/// Location of the offline-built sparse index artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseIndexConfig {
    pub artifact_path: PathBuf,
}

impl Default for SparseIndexConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("data/sparse_index.json"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RispostaError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RispostaError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RispostaError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RISPOSTA_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("RISPOSTA_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "GENERATION__MODEL" => {
                self.generation.model = value.to_string();
            }
            "GENERATION__MAX_TOKENS" => {
                self.generation.max_tokens = parse_value(path, value)?;
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RERANKER__ENABLED" => {
                self.reranker.enabled = parse_value(path, value)?;
            }
            "RERANKER__MODEL" => {
                self.reranker.model = value.to_string();
            }
            "CACHE__TTL_SECS" => {
                self.cache.ttl_secs = parse_value(path, value)?;
            }
            "SPARSE_INDEX__ARTIFACT_PATH" => {
                self.sparse_index.artifact_path = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RispostaError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("risposta").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RispostaError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
        assert_eq!(config.fusion.dense, 0.65);
        assert_eq!(config.context.max_tickets, 5);
        assert_eq!(config.cache.ttl_secs, 86_400);
    }

    #[test]
    fn toml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.fusion.sparse, config.fusion.sparse);
        assert_eq!(loaded.context.max_total_len, config.context.max_total_len);
        assert_eq!(
            loaded.vocabulary.synonyms.len(),
            config.vocabulary.synonyms.len()
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Config::load(Path::new("/nonexistent/risposta.toml"));
        assert!(matches!(result, Err(RispostaError::ConfigNotFound { .. })));
    }

    #[test]
    fn env_override_applied() {
        std::env::set_var("RISPOSTA_GENERATION__MODEL", "llama-3.1-8b");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("RISPOSTA_GENERATION__MODEL");

        assert_eq!(config.generation.model, "llama-3.1-8b");
    }
}
