//! Generative enrichment.
//!
//! Two passes, both driven by a [`TextGenerator`]:
//! 1. Term generation: each class gets candidate terms from the model, asked
//!    once per parent with that parent's context, then the terms are
//!    embedded into the class's term matrix.
//! 2. Core-class selection: each document descends the taxonomy level by
//!    level, keeping the best `level + 2` classes by term similarity, and
//!    the model picks at most one class per level from those candidates.
//!
//! A failed or empty completion only empties the result for its own class
//! or document.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use teleclass_embeddings::{max_similarity, Embedding, EmbeddingModel};
use teleclass_llm::{ChatRequest, TextGenerator};
use teleclass_taxonomy::Taxonomy;
use teleclass_types::{
    DocumentMeta, EnrichedClass, EnrichedClasses, LlmSettings, MergePolicy, PipelineSettings,
    TermScore,
};

use crate::error::EnrichmentError;
use crate::prompts::{
    core_class_prompt, parse_list_reply, render_term_prompt, TermPromptContext,
    DEFAULT_TERM_PROMPT,
};

/// Generative enrichment settings.
#[derive(Debug, Clone)]
pub struct GenerativeConfig {
    pub model: String,
    pub temperature: f32,
    pub term_prompt: String,
    pub terms_per_class: usize,
    pub timeout: Duration,
    pub max_concurrency: usize,
    pub merge_policy: MergePolicy,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default(), &PipelineSettings::default())
    }
}

impl GenerativeConfig {
    pub fn from_settings(llm: &LlmSettings, pipeline: &PipelineSettings) -> Self {
        Self {
            model: llm.model.clone(),
            temperature: llm.temperature,
            term_prompt: llm
                .term_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_TERM_PROMPT.to_string()),
            terms_per_class: llm.terms_per_class,
            timeout: Duration::from_secs(llm.timeout_secs),
            max_concurrency: pipeline.max_concurrency.max(1),
            merge_policy: pipeline.merge_policy,
        }
    }
}

/// Output of a full generative pass.
#[derive(Debug, Clone)]
pub struct GenerativeEnrichment {
    pub classes: EnrichedClasses,
    pub documents: Vec<DocumentMeta>,
}

/// Weak supervision from a generative-text model.
pub struct GenerativeEnricher {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn EmbeddingModel>,
    taxonomy: Arc<Taxonomy>,
    config: GenerativeConfig,
}

impl GenerativeEnricher {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn EmbeddingModel>,
        taxonomy: Arc<Taxonomy>,
        config: GenerativeConfig,
    ) -> Self {
        Self {
            generator,
            embedder,
            taxonomy,
            config,
        }
    }

    /// Generate terms for every class, then tag every document.
    #[instrument(skip_all, fields(classes = classes.len(), documents = documents.len()))]
    pub async fn enrich(
        &self,
        classes: EnrichedClasses,
        documents: Vec<DocumentMeta>,
    ) -> Result<GenerativeEnrichment, EnrichmentError> {
        let classes = self.enrich_classes(classes).await;
        let documents = self.assign_core_classes(documents, &classes).await;
        Ok(GenerativeEnrichment { classes, documents })
    }

    /// Completion text, or empty on timeout, error or empty reply.
    async fn complete(&self, prompt: String, unit: &str) -> String {
        let request = ChatRequest::user(&self.config.model, prompt, self.config.temperature);
        match tokio::time::timeout(self.config.timeout, self.generator.generate(&request)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => reply,
            Ok(Ok(_)) => {
                warn!(unit = %unit, "Empty response from generator");
                String::new()
            }
            Ok(Err(e)) => {
                warn!(unit = %unit, error = %e, "Generation failed");
                String::new()
            }
            Err(_) => {
                warn!(unit = %unit, timeout_secs = self.config.timeout.as_secs(), "Generation timed out");
                String::new()
            }
        }
    }

    /// Terms for one class: one request per parent, results unioned.
    pub async fn generate_terms(
        &self,
        class_name: &str,
        class_description: &str,
    ) -> Result<BTreeSet<TermScore>, EnrichmentError> {
        let parents = self.taxonomy.parents(class_name)?;
        let siblings = self.taxonomy.siblings(class_name)?;

        let parent_contexts: Vec<Option<&str>> = if parents.is_empty() {
            vec![None]
        } else {
            parents.iter().map(|p| Some(p.as_str())).collect()
        };

        let mut terms = BTreeSet::new();
        for parent in parent_contexts {
            let prompt = render_term_prompt(
                &self.config.term_prompt,
                &TermPromptContext {
                    class_name,
                    class_description,
                    parent_class: parent,
                    siblings: &siblings,
                    term_count: self.config.terms_per_class,
                },
            );
            let reply = self.complete(prompt, class_name).await;
            terms.extend(parse_list_reply(&reply).into_iter().map(TermScore::new));
        }

        debug!(class = %class_name, terms = terms.len(), "Generated terms");
        Ok(terms)
    }

    /// Generate terms for every class and rebuild each class's term matrix.
    ///
    /// Classes run concurrently up to `max_concurrency`; results are applied
    /// in class order.
    #[instrument(skip_all, fields(classes = classes.len()))]
    pub async fn enrich_classes(&self, mut classes: EnrichedClasses) -> EnrichedClasses {
        let work: Vec<(String, String)> = classes
            .values()
            .map(|c| (c.class_name.clone(), c.class_description.clone()))
            .collect();

        let generated: Vec<(String, BTreeSet<TermScore>)> = stream::iter(work)
            .map(|(name, description)| async move {
                let terms = match self.generate_terms(&name, &description).await {
                    Ok(terms) => terms,
                    Err(e) => {
                        warn!(class = %name, error = %e, "Skipping class");
                        BTreeSet::new()
                    }
                };
                (name, terms)
            })
            .buffered(self.config.max_concurrency)
            .collect()
            .await;

        for (name, terms) in generated {
            let Some(class) = classes.get_mut(&name) else {
                continue;
            };
            class.merge_terms(terms, self.config.merge_policy);
            self.embed_terms(class);
            info!(class = %name, terms = class.terms.len(), "Enriched class terms");
        }

        classes
    }

    /// Store the term-embedding matrix, one row per term in term order.
    fn embed_terms(&self, class: &mut EnrichedClass) {
        if class.terms.is_empty() {
            class.embeddings = None;
            return;
        }
        match self.embedder.embed_texts(&class.term_names()) {
            Ok(rows) => class.embeddings = Some(rows),
            Err(e) => {
                warn!(class = %class.class_name, error = %e, "Failed to embed class terms");
                class.embeddings = None;
            }
        }
    }

    /// Level-wise candidate classes for a document embedding.
    ///
    /// At level `L` the `L + 2` most similar nodes are kept and their
    /// children form the next level. A class's similarity is its best term
    /// similarity; classes without a term matrix score 0.0 and classes with
    /// no enriched entry are not considered.
    pub fn select_candidates(
        &self,
        doc_embedding: &Embedding,
        classes: &EnrichedClasses,
    ) -> BTreeMap<usize, BTreeSet<String>> {
        let mut candidates: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        let mut current: BTreeSet<String> = self.taxonomy.root_nodes();

        for level in 0..=self.taxonomy.max_depth() {
            if current.is_empty() {
                break;
            }

            let mut scored: Vec<(&str, f32)> = current
                .iter()
                .filter_map(|name| classes.get(name))
                .map(|class| {
                    let sim = class
                        .embeddings
                        .as_deref()
                        .and_then(|rows| max_similarity(doc_embedding, rows))
                        .unwrap_or(0.0);
                    (class.class_name.as_str(), sim)
                })
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

            let selected: BTreeSet<String> = scored
                .iter()
                .take(level + 2)
                .map(|(name, _)| name.to_string())
                .collect();
            debug!(level = level, candidates = ?selected, "Candidate classes");

            current = selected
                .iter()
                .filter_map(|name| self.taxonomy.children(name).ok())
                .flatten()
                .collect();
            if !selected.is_empty() {
                candidates.insert(level, selected);
            }
        }

        candidates
    }

    /// Ask the model to pick core classes among `candidates`.
    ///
    /// Names the taxonomy does not know are dropped.
    pub async fn select_core_classes(
        &self,
        document: &DocumentMeta,
        candidates: &BTreeMap<usize, BTreeSet<String>>,
    ) -> BTreeSet<String> {
        if candidates.is_empty() {
            return BTreeSet::new();
        }

        let reply = self
            .complete(core_class_prompt(&document.content, candidates), &document.id)
            .await;

        parse_list_reply(&reply)
            .into_iter()
            .filter(|name| {
                let known = self.taxonomy.contains(name);
                if !known {
                    warn!(document = %document.id, class = %name, "Dropping unknown class from reply");
                }
                known
            })
            .collect()
    }

    /// Tag each document with its core classes.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn assign_core_classes(
        &self,
        documents: Vec<DocumentMeta>,
        classes: &EnrichedClasses,
    ) -> Vec<DocumentMeta> {
        stream::iter(documents)
            .map(|mut doc| async move {
                let candidates = self.select_candidates(&doc.embedding, classes);
                let core = self.select_core_classes(&doc, &candidates).await;
                info!(document = %doc.id, core_classes = ?core, "Assigned core classes");
                doc.initial_core_classes = Some(core);
                doc
            })
            .buffered(self.config.max_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use teleclass_embeddings::{EmbeddingError, ModelInfo};
    use teleclass_llm::{GeneratorError, MockGenerator};
    use teleclass_types::TaxonomyNode;

    /// Axis embedder: each known word owns one dimension.
    struct AxisEmbedder {
        vocab: Vec<&'static str>,
        info: ModelInfo,
    }

    impl AxisEmbedder {
        fn new(vocab: Vec<&'static str>) -> Arc<Self> {
            let dimension = vocab.len() + 1;
            Arc::new(Self {
                vocab,
                info: ModelInfo {
                    name: "axis".to_string(),
                    dimension,
                    max_sequence_length: 512,
                },
            })
        }
    }

    impl EmbeddingModel for AxisEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            let lower = text.to_lowercase();
            let mut values: Vec<f32> = self
                .vocab
                .iter()
                .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                .collect();
            values.push(0.01);
            Ok(Embedding::new(values))
        }
    }

    /// Replies chosen by which registered needle the prompt contains.
    struct RoutedGenerator {
        routes: Vec<(&'static str, &'static str)>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RoutedGenerator {
        async fn generate(&self, request: &ChatRequest) -> Result<String, GeneratorError> {
            let prompt = request.prompt().unwrap_or_default().to_string();
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.clone());
            }
            Ok(self
                .routes
                .iter()
                .find(|(needle, _)| prompt.contains(needle))
                .map(|(_, reply)| reply.to_string())
                .unwrap_or_default())
        }
    }

    /// A -> {A1, A2}, B
    fn taxonomy() -> Arc<Taxonomy> {
        let definition = vec![
            TaxonomyNode::Keyed(BTreeMap::from([(
                "A".to_string(),
                vec![TaxonomyNode::leaf("A1"), TaxonomyNode::leaf("A2")],
            )])),
            TaxonomyNode::leaf("B"),
        ];
        Arc::new(Taxonomy::from_definition(&definition).unwrap())
    }

    fn empty_classes(taxonomy: &Taxonomy) -> EnrichedClasses {
        taxonomy
            .classes()
            .iter()
            .map(|c| (c.clone(), EnrichedClass::new(c.clone(), "")))
            .collect()
    }

    fn enricher(generator: Arc<dyn TextGenerator>, embedder: Arc<dyn EmbeddingModel>) -> GenerativeEnricher {
        GenerativeEnricher::new(generator, embedder, taxonomy(), GenerativeConfig::default())
    }

    #[tokio::test]
    async fn test_terms_are_generated_and_embedded() {
        let generator = Arc::new(RoutedGenerator {
            routes: vec![
                ("class 'A1'", "pm10, ozone"),
                ("class 'A'", "sensor, air"),
            ],
            prompts: Mutex::new(Vec::new()),
        });
        let embedder = AxisEmbedder::new(vec!["sensor", "air", "pm10", "ozone"]);
        let enricher = enricher(generator.clone(), embedder);

        let classes = enricher.enrich_classes(empty_classes(&enricher.taxonomy)).await;

        let a = &classes["A"];
        assert_eq!(a.term_names(), vec!["air", "sensor"]);
        assert_eq!(a.embeddings.as_ref().map(Vec::len), Some(2));
        assert_eq!(classes["A1"].term_names(), vec!["ozone", "pm10"]);
        assert!(classes["B"].terms.is_empty());
        assert!(classes["B"].embeddings.is_none());

        let prompts = generator.prompts.lock().unwrap();
        let a1_prompt = prompts.iter().find(|p| p.contains("class 'A1'")).unwrap();
        assert!(a1_prompt.contains("subclass of 'A'"));
        assert!(a1_prompt.contains("sibling classes: A2"));
        let a_prompt = prompts.iter().find(|p| p.contains("class 'A'")).unwrap();
        assert!(a_prompt.contains("subclass of 'root'"));
        assert!(a_prompt.contains("sibling classes: none"));
    }

    #[tokio::test]
    async fn test_failed_generation_degrades_to_empty() {
        let enricher = enricher(
            Arc::new(MockGenerator::failing()),
            AxisEmbedder::new(vec!["sensor"]),
        );
        let classes = enricher.enrich_classes(empty_classes(&enricher.taxonomy)).await;
        assert_eq!(classes.len(), 4);
        assert!(classes.values().all(|c| c.terms.is_empty()));
    }

    #[tokio::test]
    async fn test_one_request_per_parent() {
        let taxonomy = Arc::new(
            Taxonomy::from_edges([("P1", "X"), ("P2", "X"), ("P1", "S")]).unwrap(),
        );
        let generator = Arc::new(MockGenerator::with_reply("shared"));
        let enricher = GenerativeEnricher::new(
            generator.clone(),
            AxisEmbedder::new(vec!["shared"]),
            taxonomy,
            GenerativeConfig::default(),
        );

        let terms = enricher.generate_terms("X", "").await.unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(generator.calls(), 2);
    }

    #[test]
    fn test_candidate_selection_keeps_level_plus_two() {
        let enricher = enricher(
            Arc::new(MockGenerator::empty()),
            AxisEmbedder::new(vec!["sensor", "bus", "pm10", "ozone"]),
        );
        let mut classes = empty_classes(&enricher.taxonomy);
        for (name, term) in [("A", "sensor"), ("B", "bus"), ("A1", "pm10"), ("A2", "ozone")] {
            let class = classes.get_mut(name).unwrap();
            class.terms.insert(TermScore::new(term));
            class.embeddings = Some(vec![enricher.embedder.embed(term).unwrap()]);
        }

        let doc = enricher.embedder.embed("pm10 sensor").unwrap();
        let candidates = enricher.select_candidates(&doc, &classes);

        // Level 0 keeps both roots (top 2), level 1 keeps up to 3 children of them.
        assert_eq!(candidates[&0], BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(candidates[&1], BTreeSet::from(["A1".to_string(), "A2".to_string()]));
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_core_classes_filtered_to_taxonomy() {
        let enricher = enricher(
            Arc::new(MockGenerator::with_reply("A, A1, Bogus")),
            AxisEmbedder::new(vec!["sensor"]),
        );
        let classes = empty_classes(&enricher.taxonomy);
        let doc = DocumentMeta::new("d1", "pm10 sensor", enricher.embedder.embed("sensor").unwrap());

        let tagged = enricher.assign_core_classes(vec![doc], &classes).await;
        assert_eq!(
            tagged[0].initial_core_classes,
            Some(BTreeSet::from(["A".to_string(), "A1".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_empty_reply_tags_document_with_empty_set() {
        let enricher = enricher(Arc::new(MockGenerator::empty()), AxisEmbedder::new(vec!["sensor"]));
        let classes = empty_classes(&enricher.taxonomy);
        let doc = DocumentMeta::new("d1", "text", enricher.embedder.embed("sensor").unwrap());

        let tagged = enricher.assign_core_classes(vec![doc], &classes).await;
        assert_eq!(tagged[0].initial_core_classes, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn test_document_order_preserved() {
        let enricher = enricher(Arc::new(MockGenerator::with_reply("B")), AxisEmbedder::new(vec!["x"]));
        let classes = empty_classes(&enricher.taxonomy);
        let docs: Vec<DocumentMeta> = (0..10)
            .map(|i| DocumentMeta::new(i.to_string(), "x", Embedding::new(vec![1.0, 0.0])))
            .collect();

        let tagged = enricher.assign_core_classes(docs, &classes).await;
        let ids: Vec<String> = tagged.iter().map(|d| d.id.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }
}
