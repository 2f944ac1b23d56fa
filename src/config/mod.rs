//! Configuration management.
//!
//! The scoring weights are preserved from the original pipeline for
//! behavioral parity. They have no documented derivation; treat them as
//! tunable configuration, not a validated algorithm.

use serde::Deserialize;
use std::path::Path;

/// Main configuration for lorekeeper.
#[derive(Debug, Clone, Default)]
pub struct LorekeeperConfig {
    /// Retrieval scoring weights.
    pub scoring: ScoringConfig,
    /// Embedding cache settings.
    pub cache: CacheConfig,
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,
    /// Orchestrator phase settings.
    pub orchestrator: OrchestratorConfig,
}

/// Weights for the multi-stage relevance score.
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    /// Weight of the semantic score when blending in entity boosts.
    pub semantic_weight: f32,
    /// Weight of the accumulated entity boost.
    pub entity_weight: f32,
    /// Weight of the pre-blend score when blending in context hints.
    pub blend_weight: f32,
    /// Weight of the mean hint similarity.
    pub hint_weight: f32,
    /// Boost for a case-insensitive entity match in the title.
    pub title_boost: f32,
    /// Boost for an entity match in the document id.
    pub id_boost: f32,
    /// Boost per body occurrence of an entity.
    pub body_boost_per_occurrence: f32,
    /// Cap on the total body-occurrence boost (diminishing returns).
    pub body_boost_cap: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.75,
            entity_weight: 0.25,
            blend_weight: 0.85,
            hint_weight: 0.15,
            title_boost: 0.3,
            id_boost: 0.2,
            body_boost_per_occurrence: 0.25,
            body_boost_cap: 0.5,
        }
    }
}

/// Embedding cache settings.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of cached embeddings.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Provider name: "anthropic" or "ollama".
    pub provider: LlmProviderKind,
    /// Model name.
    pub model: Option<String>,
    /// API key (falls back to the provider's environment variable).
    pub api_key: Option<String>,
    /// Base URL for the provider (for self-hosted).
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderKind {
    /// Anthropic Claude.
    #[default]
    Anthropic,
    /// Ollama (local).
    Ollama,
}

impl LlmProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            _ => Self::Anthropic,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider name: "openai" or "hash".
    pub provider: EmbeddingProviderKind,
    /// Model name.
    pub model: Option<String>,
    /// API key (falls back to the provider's environment variable).
    pub api_key: Option<String>,
    /// Base URL for the provider.
    pub base_url: Option<String>,
    /// Vector dimensionality.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: None,
            api_key: None,
            base_url: None,
            dimensions: 384,
        }
    }
}

/// Available embedding providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProviderKind {
    /// Deterministic local hash embedder (no network).
    #[default]
    Hash,
    /// OpenAI-compatible HTTP API.
    OpenAi,
}

impl EmbeddingProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "openai" | "open_ai" | "open-ai" => Self::OpenAi,
            _ => Self::Hash,
        }
    }
}

/// Orchestrator phase settings.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Deadline for the decision phase in milliseconds.
    pub decision_timeout_ms: u64,
    /// Deadline for the retrieval phase in milliseconds.
    pub retrieval_timeout_ms: u64,
    /// Deadline for the synthesis call in milliseconds.
    pub synthesis_timeout_ms: u64,
    /// Results requested per source when the caller does not specify `k`.
    pub default_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            decision_timeout_ms: 10_000,
            retrieval_timeout_ms: 15_000,
            synthesis_timeout_ms: 30_000,
            default_k: 5,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Scoring weights.
    pub scoring: Option<ConfigFileScoring>,
    /// Cache settings.
    pub cache: Option<ConfigFileCache>,
    /// LLM configuration.
    pub llm: Option<ConfigFileLlm>,
    /// Embedding configuration.
    pub embedding: Option<ConfigFileEmbedding>,
    /// Orchestrator settings.
    pub orchestrator: Option<ConfigFileOrchestrator>,
}

/// Scoring section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileScoring {
    /// Semantic weight.
    pub semantic_weight: Option<f32>,
    /// Entity weight.
    pub entity_weight: Option<f32>,
    /// Blend weight.
    pub blend_weight: Option<f32>,
    /// Hint weight.
    pub hint_weight: Option<f32>,
    /// Title boost.
    pub title_boost: Option<f32>,
    /// Id boost.
    pub id_boost: Option<f32>,
    /// Body boost per occurrence.
    pub body_boost_per_occurrence: Option<f32>,
    /// Body boost cap.
    pub body_boost_cap: Option<f32>,
}

/// Cache section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// Capacity.
    pub capacity: Option<usize>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Embedding section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEmbedding {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Dimensions.
    pub dimensions: Option<usize>,
}

/// Orchestrator section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileOrchestrator {
    /// Decision phase deadline in milliseconds.
    pub decision_timeout_ms: Option<u64>,
    /// Retrieval phase deadline in milliseconds.
    pub retrieval_timeout_ms: Option<u64>,
    /// Synthesis deadline in milliseconds.
    pub synthesis_timeout_ms: Option<u64>,
    /// Default k.
    pub default_k: Option<usize>,
}

impl LorekeeperConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/lorekeeper/`.
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("lorekeeper")
            .join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("lorekeeper")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `LorekeeperConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(scoring) = file.scoring {
            let s = &mut config.scoring;
            if let Some(v) = scoring.semantic_weight {
                s.semantic_weight = v;
            }
            if let Some(v) = scoring.entity_weight {
                s.entity_weight = v;
            }
            if let Some(v) = scoring.blend_weight {
                s.blend_weight = v;
            }
            if let Some(v) = scoring.hint_weight {
                s.hint_weight = v;
            }
            if let Some(v) = scoring.title_boost {
                s.title_boost = v;
            }
            if let Some(v) = scoring.id_boost {
                s.id_boost = v;
            }
            if let Some(v) = scoring.body_boost_per_occurrence {
                s.body_boost_per_occurrence = v;
            }
            if let Some(v) = scoring.body_boost_cap {
                s.body_boost_cap = v;
            }
        }
        if let Some(cache) = file.cache {
            if let Some(capacity) = cache.capacity {
                config.cache.capacity = capacity.max(1);
            }
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = LlmProviderKind::parse(&provider);
            }
            config.llm.model = llm.model;
            config.llm.api_key = llm.api_key;
            config.llm.base_url = llm.base_url;
            config.llm.timeout_ms = llm.timeout_ms;
            config.llm.connect_timeout_ms = llm.connect_timeout_ms;
        }
        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                config.embedding.provider = EmbeddingProviderKind::parse(&provider);
            }
            config.embedding.model = embedding.model;
            config.embedding.api_key = embedding.api_key;
            config.embedding.base_url = embedding.base_url;
            if let Some(dimensions) = embedding.dimensions {
                config.embedding.dimensions = dimensions;
            }
        }
        if let Some(orchestrator) = file.orchestrator {
            let o = &mut config.orchestrator;
            if let Some(v) = orchestrator.decision_timeout_ms {
                o.decision_timeout_ms = v;
            }
            if let Some(v) = orchestrator.retrieval_timeout_ms {
                o.retrieval_timeout_ms = v;
            }
            if let Some(v) = orchestrator.synthesis_timeout_ms {
                o.synthesis_timeout_ms = v;
            }
            if let Some(v) = orchestrator.default_k {
                o.default_k = v.max(1);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_weights() {
        let scoring = ScoringConfig::default();
        assert!((scoring.semantic_weight - 0.75).abs() < f32::EPSILON);
        assert!((scoring.entity_weight - 0.25).abs() < f32::EPSILON);
        assert!((scoring.blend_weight - 0.85).abs() < f32::EPSILON);
        assert!((scoring.hint_weight - 0.15).abs() < f32::EPSILON);
        assert!((scoring.body_boost_cap - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProviderKind::parse("ollama"), LlmProviderKind::Ollama);
        assert_eq!(LlmProviderKind::parse("anything"), LlmProviderKind::Anthropic);
        assert_eq!(EmbeddingProviderKind::parse("openai"), EmbeddingProviderKind::OpenAi);
        assert_eq!(EmbeddingProviderKind::parse("hash"), EmbeddingProviderKind::Hash);
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [scoring]
            semantic_weight = 0.6
            entity_weight = 0.4

            [cache]
            capacity = 16

            [llm]
            provider = "ollama"
            model = "mistral"
            timeout_ms = 5000

            [orchestrator]
            default_k = 3
        "#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = LorekeeperConfig::from_config_file(file);

        assert!((config.scoring.semantic_weight - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.llm.provider, LlmProviderKind::Ollama);
        assert_eq!(config.llm.model.as_deref(), Some("mistral"));
        assert_eq!(config.llm.timeout_ms, Some(5000));
        assert_eq!(config.orchestrator.default_k, 3);
        // untouched sections keep defaults
        assert!((config.scoring.blend_weight - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let file: ConfigFile = toml::from_str("[cache]\ncapacity = 0").unwrap();
        let config = LorekeeperConfig::from_config_file(file);
        assert_eq!(config.cache.capacity, 1);
    }
}
