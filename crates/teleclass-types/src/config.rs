//! Configuration loading for teleclass.
//!
//! Layered config: defaults -> platform config file -> explicit file -> env vars.
//! Environment variables use the `TELECLASS` prefix with `__` between
//! nesting levels, e.g. `TELECLASS_LLM__MODEL=mistral`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::term::MergePolicy;

/// Generative-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of an Ollama-compatible chat endpoint
    #[serde(default = "default_llm_host")]
    pub host: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    /// Overrides the built-in term prompt. Placeholders: `{class_name}`,
    /// `{class_description}`, `{parent_class}`, `{siblings}`, `{term_count}`.
    #[serde(default)]
    pub term_prompt: Option<String>,

    #[serde(default = "default_terms_per_class")]
    pub terms_per_class: usize,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for hosted endpoints (optional)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_llm_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.1".to_string()
}

fn default_terms_per_class() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            host: default_llm_host(),
            model: default_llm_model(),
            temperature: 0.0,
            term_prompt: None,
            terms_per_class: default_terms_per_class(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// HuggingFace repository of the sentence transformer
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model-file cache override; platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            cache_dir: None,
        }
    }
}

/// Which phrase extractor corpus enrichment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseExtractorKind {
    /// Keyword statistics over one document (casing, position, frequency).
    #[default]
    Statistical,
    /// Candidates ranked by similarity to the document embedding.
    EmbeddingRanked,
}

/// Corpus enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSettings {
    #[serde(default)]
    pub phrase_extractor: PhraseExtractorKind,

    /// Phrases returned per extraction call
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Terms kept per class after affinity ranking
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// Candidate pool for max-sum diversification
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_top_n() -> usize {
    5
}

fn default_top_k() -> usize {
    3
}

fn default_max_ngram() -> usize {
    3
}

fn default_max_candidates() -> usize {
    10
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            phrase_extractor: PhraseExtractorKind::default(),
            top_n: default_top_n(),
            top_k: default_top_k(),
            max_ngram: default_max_ngram(),
            max_candidates: default_max_candidates(),
        }
    }
}

/// Enrichment cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Treat artifacts built against another taxonomy as a miss
    #[serde(default = "default_true")]
    pub verify_taxonomy: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(".teleclass_cache")
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_directory(),
            verify_taxonomy: true,
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Documents used for enrichment on the first classification run
    #[serde(default = "default_training_sample_size")]
    pub training_sample_size: usize,

    /// Concurrent generation requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub merge_policy: MergePolicy,
}

fn default_training_sample_size() -> usize {
    20
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            training_sample_size: default_training_sample_size(),
            max_concurrency: default_max_concurrency(),
            merge_policy: MergePolicy::default(),
        }
    }
}

/// Descriptive metadata for the taxonomy as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyMetadata {
    /// Becomes the attribute label of classification results
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// One item of a nested taxonomy definition.
///
/// ```json
/// [
///   "weather",
///   {"name": "air", "description": "Air quality", "children": ["pm10"]},
///   {"mobility": ["traffic", "parking"]}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaxonomyNode {
    /// A leaf with no description
    Leaf(String),
    /// A described node with optional children
    Described {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        children: Vec<TaxonomyNode>,
    },
    /// `{"<name>": [children...]}`; exactly one key is allowed
    Keyed(BTreeMap<String, Vec<TaxonomyNode>>),
}

impl TaxonomyNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    pub fn described(
        name: impl Into<String>,
        description: impl Into<String>,
        children: Vec<TaxonomyNode>,
    ) -> Self {
        Self::Described {
            name: name.into(),
            description: description.into(),
            children,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub corpus: CorpusSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub taxonomy_metadata: TaxonomyMetadata,

    /// Nested taxonomy definition
    #[serde(default)]
    pub taxonomy: Vec<TaxonomyNode>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            corpus: CorpusSettings::default(),
            cache: CacheSettings::default(),
            pipeline: PipelineSettings::default(),
            taxonomy_metadata: TaxonomyMetadata::default(),
            taxonomy: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. config.{toml,json,yaml} in the platform config dir (optional)
    /// 3. Explicit config file (required when given)
    /// 4. Environment variables (TELECLASS_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, TypesError> {
        let default_config_path = ProjectDirs::from("", "", "teleclass")
            .map(|p| p.config_dir().join("config"))
            .unwrap_or_else(|| PathBuf::from("config"));

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("llm.host", default_llm_host())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("llm.model", default_llm_model())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("cache.directory", ".teleclass_cache")
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TELECLASS_LOG_LEVEL, TELECLASS_LLM__MODEL, TELECLASS_CORPUS__TOP_K
        builder = builder.add_source(
            Environment::with_prefix("TELECLASS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TypesError::Config(format!(
                "llm.temperature must be 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(TypesError::Config(
                "llm.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.corpus.top_k == 0 {
            return Err(TypesError::Config("corpus.top_k must be > 0".to_string()));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(TypesError::Config(
                "pipeline.max_concurrency must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.llm.host, "http://localhost:11434");
        assert_eq!(settings.llm.terms_per_class, 10);
        assert_eq!(settings.corpus.top_k, 3);
        assert_eq!(settings.corpus.top_n, 5);
        assert_eq!(settings.pipeline.training_sample_size, 20);
        assert_eq!(settings.pipeline.merge_policy, MergePolicy::LatestWins);
        assert_eq!(settings.corpus.phrase_extractor, PhraseExtractorKind::Statistical);
        assert!(settings.cache.enabled);
        assert!(settings.cache.verify_taxonomy);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.cache.directory, PathBuf::from(".teleclass_cache"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "llm": {{"model": "mistral", "temperature": 0.3}},
                "corpus": {{"phrase_extractor": "embedding_ranked", "top_k": 5}},
                "pipeline": {{"merge_policy": "first_wins"}},
                "taxonomy_metadata": {{"name": "topic"}},
                "taxonomy": [{{"name": "air", "children": ["pm10"]}}, "weather"]
            }}"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.llm.model, "mistral");
        assert_eq!(settings.corpus.phrase_extractor, PhraseExtractorKind::EmbeddingRanked);
        assert_eq!(settings.corpus.top_k, 5);
        assert_eq!(settings.pipeline.merge_policy, MergePolicy::FirstWins);
        assert_eq!(settings.taxonomy_metadata.name, "topic");
        assert_eq!(settings.taxonomy.len(), 2);
        assert_eq!(settings.taxonomy[1], TaxonomyNode::leaf("weather"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some("/nonexistent/teleclass.toml")).is_err());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.llm.temperature = 2.5;
        assert!(settings.validate().is_err());

        settings.llm.temperature = 0.0;
        settings.corpus.top_k = 0;
        assert!(settings.validate().is_err());

        settings.corpus.top_k = 3;
        settings.pipeline.max_concurrency = 0;
        assert!(settings.validate().is_err());

        settings.pipeline.max_concurrency = 4;
        settings.llm.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_taxonomy_definition_forms() {
        let nodes: Vec<TaxonomyNode> = serde_json::from_str(
            r#"[
                "weather",
                {"name": "air", "description": "Air quality", "children": ["pm10"]},
                {"mobility": ["traffic", "parking"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(nodes[0], TaxonomyNode::leaf("weather"));
        assert_eq!(
            nodes[1],
            TaxonomyNode::described("air", "Air quality", vec![TaxonomyNode::leaf("pm10")])
        );
        match &nodes[2] {
            TaxonomyNode::Keyed(map) => assert_eq!(map["mobility"].len(), 2),
            other => panic!("expected keyed node, got {:?}", other),
        }
    }
}
