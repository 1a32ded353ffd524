//! Prototype-based top-down classifier.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use teleclass_embeddings::{mean_embedding, Embedding, EmbeddingModel};
use teleclass_taxonomy::Taxonomy;
use teleclass_types::{DocumentMeta, EnrichedClass, EnrichedClasses};

use crate::error::ClassifierError;
use crate::metrics::{evaluate_predictions, Metrics};

/// Where a class prototype came from, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeSource {
    /// Mean of the class's stored term-embedding matrix
    Precomputed,
    /// Mean of freshly embedded term texts
    Terms,
    /// Embedding of the class name
    Name,
}

/// Classifies documents by walking the taxonomy with class prototypes.
pub struct SimilarityClassifier {
    embedder: Arc<dyn EmbeddingModel>,
    taxonomy: Arc<Taxonomy>,
    prototypes: HashMap<String, (Embedding, PrototypeSource)>,
}

impl SimilarityClassifier {
    /// Build one prototype per taxonomy class.
    ///
    /// Classes absent from `classes` fall back to their name.
    #[instrument(skip_all, fields(classes = taxonomy.len()))]
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        taxonomy: Arc<Taxonomy>,
        classes: &EnrichedClasses,
    ) -> Result<Self, ClassifierError> {
        let mut prototypes = HashMap::with_capacity(taxonomy.len());
        for name in taxonomy.classes() {
            let prototype = build_prototype(embedder.as_ref(), name, classes.get(name))?;
            debug!(class = %name, source = ?prototype.1, "Built prototype");
            prototypes.insert(name.clone(), prototype);
        }
        info!(prototypes = prototypes.len(), "Classifier ready");

        Ok(Self {
            embedder,
            taxonomy,
            prototypes,
        })
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn prototype(&self, class: &str) -> Option<&Embedding> {
        self.prototypes.get(class).map(|(e, _)| e)
    }

    pub fn prototype_source(&self, class: &str) -> Option<PrototypeSource> {
        self.prototypes.get(class).map(|(_, s)| *s)
    }

    /// Classes on the predicted root-to-node path for `text`.
    pub fn predict(&self, text: &str) -> Result<BTreeSet<String>, ClassifierError> {
        let embedding = self.embedder.embed(text)?;
        Ok(self.predict_embedding(&embedding))
    }

    /// Classes on the predicted root-to-node path for an embedded document.
    ///
    /// At each level only the best-scoring candidate is kept; ties go to the
    /// lexicographically smallest class name.
    pub fn predict_embedding(&self, embedding: &Embedding) -> BTreeSet<String> {
        let mut path = BTreeSet::new();
        let mut candidates = self.taxonomy.root_nodes();

        for level in 0..=self.taxonomy.max_depth() {
            if candidates.is_empty() {
                break;
            }

            let mut best: Option<(&str, f32)> = None;
            for name in &candidates {
                let Some((prototype, _)) = self.prototypes.get(name) else {
                    continue;
                };
                let score = self.embedder.similarity(embedding, prototype);
                debug!(level = level, class = %name, score = score, "Candidate score");
                // Candidates iterate in name order, so strict > keeps the first on ties.
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((name.as_str(), score));
                }
            }

            let Some((selected, _)) = best else {
                break;
            };
            path.insert(selected.to_string());
            candidates = self.taxonomy.children(selected).unwrap_or_default();
        }

        path
    }

    /// Predict every document and score against `true_labels`.
    pub fn evaluate(
        &self,
        documents: &[DocumentMeta],
        true_labels: &[BTreeSet<String>],
    ) -> Result<Metrics, ClassifierError> {
        if documents.len() != true_labels.len() {
            return Err(ClassifierError::LabelCountMismatch {
                documents: documents.len(),
                labels: true_labels.len(),
            });
        }

        let predictions: Vec<BTreeSet<String>> = documents
            .iter()
            .map(|doc| {
                let pred = self.predict_embedding(&doc.embedding);
                debug!(document = %doc.id, prediction = ?pred, "Predicted");
                pred
            })
            .collect();

        let metrics = evaluate_predictions(&predictions, true_labels);
        info!(
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "Evaluated classifier"
        );
        Ok(metrics)
    }
}

fn build_prototype(
    embedder: &dyn EmbeddingModel,
    name: &str,
    class: Option<&EnrichedClass>,
) -> Result<(Embedding, PrototypeSource), ClassifierError> {
    if let Some(class) = class {
        if let Some(mean) = class.embeddings.as_deref().and_then(mean_embedding) {
            return Ok((mean, PrototypeSource::Precomputed));
        }

        if !class.terms.is_empty() {
            match embedder.embed_texts(&class.term_names()) {
                Ok(rows) => {
                    if let Some(mean) = mean_embedding(&rows) {
                        return Ok((mean, PrototypeSource::Terms));
                    }
                }
                Err(e) => warn!(class = %name, error = %e, "Falling back to class name prototype"),
            }
        }
    }

    Ok((embedder.embed(name)?, PrototypeSource::Name))
}
