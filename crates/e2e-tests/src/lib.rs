//! End-to-end test infrastructure for TELEClass.
//!
//! Provides deterministic doubles for the two external capabilities and a
//! harness owning a temporary cache directory, so scenario tests can run
//! the whole pipeline without a model download or a generative endpoint.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use teleclass_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo};
use teleclass_llm::{ChatRequest, GeneratorError, TextGenerator};
use teleclass_orchestrator::{TeleClass, TeleClassError};
use teleclass_types::{DocumentMeta, Settings, TaxonomyMetadata, TaxonomyNode};

/// Axis embedder: one dimension per vocabulary word plus a small bias
/// dimension, so no text embeds to the zero vector.
pub struct KeywordEmbedder {
    vocab: Vec<String>,
    info: ModelInfo,
}

impl KeywordEmbedder {
    pub fn new(vocab: &[&str]) -> Self {
        Self {
            vocab: vocab.iter().map(|w| w.to_string()).collect(),
            info: ModelInfo {
                name: "keyword".to_string(),
                dimension: vocab.len() + 1,
                max_sequence_length: 512,
            },
        }
    }
}

impl EmbeddingModel for KeywordEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();
        let mut values: Vec<f32> = self
            .vocab
            .iter()
            .map(|v| words.iter().filter(|w| *w == v).count() as f32)
            .collect();
        values.push(0.01);
        Ok(Embedding::new(values))
    }
}

/// Canned completions: the first route whose needle occurs in the prompt
/// wins; otherwise the fallback reply is returned.
pub struct ScriptedGenerator {
    routes: Vec<(String, String)>,
    fallback: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(routes: &[(&str, &str)]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
                .collect(),
            fallback: String::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &ChatRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt().unwrap_or_default().to_string();
        let reply = self
            .routes
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }
        Ok(reply)
    }
}

/// Vocabulary of the sensor scenario.
pub const SENSOR_VOCAB: &[&str] = &[
    "air", "sensor", "pm10", "particulate", "ozone", "smog", "bus", "traffic",
];

/// `A -> {A1, A2}`, `B`, with descriptions.
pub fn sensor_taxonomy() -> Vec<TaxonomyNode> {
    vec![
        TaxonomyNode::described(
            "A",
            "air quality monitoring",
            vec![
                TaxonomyNode::described("A1", "particulate matter", vec![]),
                TaxonomyNode::described("A2", "ozone", vec![]),
            ],
        ),
        TaxonomyNode::leaf("B"),
    ]
}

/// Replies for the sensor scenario. Core-class routes key on words unique
/// to each training record; term routes key on the class being asked for.
pub fn sensor_generator() -> ScriptedGenerator {
    ScriptedGenerator::new(&[
        ("roof", "A, A1"),
        ("park", "A, A2"),
        ("downtown", "B"),
        ("school", "A, A1"),
        ("class 'A1'", "pm10, particulate"),
        ("class 'A2'", "ozone, smog"),
        ("class 'A'", "air, sensor"),
        ("class 'B'", "bus, traffic"),
    ])
}

/// Training records for the sensor scenario.
pub fn sensor_records() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({"id": "d1", "name": "pm10 sensor on the roof"}),
        serde_json::json!({"id": "d2", "name": "ozone sensor at the park"}),
        serde_json::json!({"id": "d3", "name": "bus traffic counter downtown"}),
        serde_json::json!({"id": "d4", "name": "pm10 particulate sensor by the school"}),
    ]
}

/// A document already tagged with core classes.
pub fn tagged_document(
    embedder: &dyn EmbeddingModel,
    id: &str,
    content: &str,
    classes: &[&str],
) -> DocumentMeta {
    let embedding = embedder
        .embed(content)
        .unwrap_or_else(|_| Embedding::new(vec![0.0; embedder.info().dimension]));
    DocumentMeta::new(id, content, embedding).with_core_classes(classes.iter().copied())
}

/// Shared test harness for end-to-end tests.
///
/// Owns a temp directory used as the enrichment cache.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub cache_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let cache_dir = temp_dir.path().join("cache");
        Self {
            _temp_dir: temp_dir,
            cache_dir,
        }
    }

    /// Scenario settings: sensor taxonomy, cache in the temp dir.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.taxonomy = sensor_taxonomy();
        settings.taxonomy_metadata = TaxonomyMetadata {
            name: "sensor_type".to_string(),
            description: "What a sensor measures".to_string(),
        };
        settings.cache.directory = self.cache_dir.clone();
        settings.pipeline.max_concurrency = 2;
        settings
    }

    /// A pipeline over `settings` with the given doubles.
    pub fn teleclass(
        &self,
        settings: Settings,
        embedder: Arc<dyn EmbeddingModel>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<TeleClass, TeleClassError> {
        TeleClass::builder()
            .settings(settings)
            .embedder(embedder)
            .generator(generator)
            .build()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Document ids per leaf, for compact assertions.
pub fn ids_by_leaf(
    result: &teleclass_types::ClassificationResult,
) -> BTreeMap<String, Vec<String>> {
    result
        .classification_result
        .iter()
        .map(|(leaf, docs)| (leaf.clone(), docs.iter().map(|d| d.id.clone()).collect()))
        .collect()
}
