//! Corpus-based enrichment.
//!
//! Uses the core classes already attached to documents to mine each class's
//! documents for key phrases, then scores every phrase by popularity,
//! distinctiveness against sibling classes and semantic similarity to the
//! class name. The best `top_k` phrases by affinity are kept.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use teleclass_embeddings::EmbeddingModel;
use teleclass_taxonomy::Taxonomy;
use teleclass_types::{CorpusSettings, DocumentMeta, EnrichedClass, EnrichedClasses, TermScore};

use crate::error::EnrichmentError;
use crate::phrases::PhraseExtractor;
use crate::scoring::{distinctiveness, popularity};

/// Corpus enrichment settings.
#[derive(Debug, Clone, Copy)]
pub struct CorpusConfig {
    /// Phrases requested from the extractor per class
    pub top_n: usize,
    /// Scored terms kept per class
    pub top_k: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { top_n: 5, top_k: 3 }
    }
}

impl From<&CorpusSettings> for CorpusConfig {
    fn from(settings: &CorpusSettings) -> Self {
        Self {
            top_n: settings.top_n,
            top_k: settings.top_k,
        }
    }
}

/// Scores candidate phrases from class-tagged documents.
pub struct CorpusEnricher {
    embedder: Arc<dyn EmbeddingModel>,
    taxonomy: Arc<Taxonomy>,
    extractor: Box<dyn PhraseExtractor>,
    config: CorpusConfig,
}

impl CorpusEnricher {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        taxonomy: Arc<Taxonomy>,
        extractor: Box<dyn PhraseExtractor>,
        config: CorpusConfig,
    ) -> Self {
        Self {
            embedder,
            taxonomy,
            extractor,
            config,
        }
    }

    /// Enrich every class that at least one document is tagged with.
    ///
    /// Fails if any document has no core classes at all; a document tagged
    /// with an empty set simply contributes nothing.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn enrich(&self, documents: &[DocumentMeta]) -> Result<EnrichedClasses, EnrichmentError> {
        let mut class_docs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for doc in documents {
            let core = doc.initial_core_classes.as_ref().ok_or_else(|| {
                EnrichmentError::MissingCoreClasses {
                    document_id: doc.id.clone(),
                }
            })?;
            for class in core {
                class_docs
                    .entry(class.as_str())
                    .or_default()
                    .push(doc.content.as_str());
            }
        }

        let mut enriched = EnrichedClasses::new();
        for (&class, docs) in &class_docs {
            if !self.taxonomy.contains(class) {
                warn!(class = %class, "Skipping tagged class missing from taxonomy");
                continue;
            }

            let sibling_docs: Vec<Vec<&str>> = self
                .taxonomy
                .siblings(class)?
                .iter()
                .filter_map(|sibling| class_docs.get(sibling.as_str()).cloned())
                .collect();

            let result = self.enrich_class(class, docs, &sibling_docs);
            info!(class = %class, documents = docs.len(), terms = result.terms.len(), "Corpus-enriched class");
            enriched.insert(class.to_string(), result);
        }

        Ok(enriched)
    }

    /// Extract and score terms for one class.
    pub fn enrich_class(
        &self,
        class_name: &str,
        class_docs: &[&str],
        sibling_docs: &[Vec<&str>],
    ) -> EnrichedClass {
        let description = self.taxonomy.description(class_name).unwrap_or_default();
        let mut class = EnrichedClass::new(class_name, description);

        let text = class_docs.join("\n");
        let candidates = match self.extractor.extract(&text, self.config.top_n) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(class = %class_name, error = %e, "Phrase extraction failed");
                return class;
            }
        };
        class.terms = self.score_terms(class_name, &candidates, class_docs, sibling_docs);
        class
    }

    /// Score `candidates` and keep the best `top_k` by affinity.
    pub fn score_terms(
        &self,
        class_name: &str,
        candidates: &[String],
        class_docs: &[&str],
        sibling_docs: &[Vec<&str>],
    ) -> BTreeSet<TermScore> {
        let class_embedding = match self.embedder.embed(class_name) {
            Ok(e) => e,
            Err(e) => {
                warn!(class = %class_name, error = %e, "Failed to embed class name");
                return BTreeSet::new();
            }
        };

        let mut ranked: Vec<(f64, TermScore)> = Vec::with_capacity(candidates.len());
        for term in candidates {
            let term_embedding = match self.embedder.embed(term) {
                Ok(e) => e,
                Err(e) => {
                    warn!(class = %class_name, term = %term, error = %e, "Skipping term");
                    continue;
                }
            };

            let score = TermScore::scored(
                term.clone(),
                popularity(term, class_docs),
                distinctiveness(term, class_docs, sibling_docs),
                f64::from(self.embedder.similarity(&term_embedding, &class_embedding)),
            );
            match score.affinity_score() {
                Ok(affinity) => {
                    debug!(
                        class = %class_name,
                        term = %term,
                        popularity = ?score.popularity,
                        distinctiveness = ?score.distinctiveness,
                        semantic_similarity = ?score.semantic_similarity,
                        affinity = affinity,
                        "Scored term"
                    );
                    ranked.push((affinity, score));
                }
                Err(e) => warn!(class = %class_name, error = %e, "Skipping unscored term"),
            }
        }

        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.term.cmp(&b.1.term)));
        ranked
            .into_iter()
            .take(self.config.top_k)
            .map(|(_, score)| score)
            .collect()
    }
}
