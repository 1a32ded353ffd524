//! The TELEClass pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use teleclass_cache::EnrichmentCache;
use teleclass_classifier::SimilarityClassifier;
use teleclass_embeddings::{CandleEmbedder, EmbeddingModel, ModelCache};
use teleclass_enrichment::{
    build_extractor, CorpusConfig, CorpusEnricher, GenerativeConfig, GenerativeEnricher,
    GenerativeEnrichment,
};
use teleclass_llm::{OllamaConfig, OllamaGenerator, TextGenerator};
use teleclass_taxonomy::Taxonomy;
use teleclass_types::{
    ClassificationResult, DocumentMeta, DocumentSource, EnrichedClass, EnrichedClasses, Settings,
};

use crate::error::TeleClassError;
use crate::loader::load_documents;

/// Assembles a [`TeleClass`].
///
/// Anything not supplied is derived from the settings: the taxonomy from
/// its nested definition, the embedder as a local Candle model and the
/// generator as an Ollama client.
#[derive(Default)]
pub struct TeleClassBuilder {
    settings: Option<Settings>,
    taxonomy: Option<Taxonomy>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl TeleClassBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingModel>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn build(self) -> Result<TeleClass, TeleClassError> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        let taxonomy = match self.taxonomy {
            Some(taxonomy) => taxonomy,
            None => Taxonomy::from_definition(&settings.taxonomy)?,
        };

        let embedder = match self.embedder {
            Some(embedder) => embedder,
            None => {
                let cache = match &settings.embedding.cache_dir {
                    Some(dir) => ModelCache::new(dir.clone(), settings.embedding.model_repo.clone()),
                    None => ModelCache::for_repo(settings.embedding.model_repo.clone()),
                };
                Arc::new(CandleEmbedder::load(&cache)?) as Arc<dyn EmbeddingModel>
            }
        };

        let generator = match self.generator {
            Some(generator) => generator,
            None => Arc::new(OllamaGenerator::new(OllamaConfig::from_settings(&settings.llm))?)
                as Arc<dyn TextGenerator>,
        };

        let cache = settings
            .cache
            .enabled
            .then(|| EnrichmentCache::from_settings(&settings.cache, taxonomy.fingerprint()));

        info!(
            classes = taxonomy.len(),
            max_depth = taxonomy.max_depth(),
            cache = cache.is_some(),
            "TELEClass initialized"
        );

        let enriched_classes = initial_classes(&taxonomy);
        Ok(TeleClass {
            settings,
            taxonomy: Arc::new(taxonomy),
            embedder,
            generator,
            cache,
            enriched_classes,
            classifier: None,
        })
    }
}

/// Every taxonomy class with its description and no terms.
fn initial_classes(taxonomy: &Taxonomy) -> EnrichedClasses {
    taxonomy
        .classes()
        .iter()
        .map(|name| {
            let description = taxonomy.description(name).unwrap_or_default();
            (name.clone(), EnrichedClass::new(name.clone(), description))
        })
        .collect()
}

/// Taxonomy-enhanced weakly-supervised classifier.
pub struct TeleClass {
    settings: Settings,
    taxonomy: Arc<Taxonomy>,
    embedder: Arc<dyn EmbeddingModel>,
    generator: Arc<dyn TextGenerator>,
    cache: Option<EnrichmentCache>,
    enriched_classes: EnrichedClasses,
    classifier: Option<SimilarityClassifier>,
}

impl TeleClass {
    pub fn builder() -> TeleClassBuilder {
        TeleClassBuilder::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn cache(&self) -> Option<&EnrichmentCache> {
        self.cache.as_ref()
    }

    /// Whether a classifier has been built.
    pub fn is_trained(&self) -> bool {
        self.classifier.is_some()
    }

    /// The current class map: empty term sets before training, merged
    /// terms after.
    pub fn enriched_classes(&self) -> &EnrichedClasses {
        &self.enriched_classes
    }

    /// Train on at most `training_sample_size` of `documents`.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn run(&mut self, mut documents: Vec<DocumentMeta>) -> Result<(), TeleClassError> {
        documents.truncate(self.settings.pipeline.training_sample_size);
        info!(documents = documents.len(), "Starting training");

        let GenerativeEnrichment {
            classes: generated,
            documents: tagged,
        } = self.acquire_generative(documents).await?;
        info!("Finished generative enrichment");

        let corpus = self.corpus_enricher().enrich(&tagged)?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_corpus_terms(&corpus) {
                warn!(error = %e, "Failed to cache corpus enrichment");
            }
        }
        info!(classes = corpus.len(), "Finished corpus enrichment");

        let merged = self.merge(generated, corpus);
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_class_terms(&merged) {
                warn!(error = %e, "Failed to cache merged class terms");
            }
        }

        let classifier =
            SimilarityClassifier::new(self.embedder.clone(), self.taxonomy.clone(), &merged)?;
        self.enriched_classes = merged;
        self.classifier = Some(classifier);
        info!("Training complete");
        Ok(())
    }

    /// Generative output, reusing cached artifacts where possible.
    ///
    /// | cached terms | cached assignments | action |
    /// |---|---|---|
    /// | yes | yes | reuse both |
    /// | yes | no | reuse terms, tag documents |
    /// | no | - | full generative enrichment |
    async fn acquire_generative(
        &self,
        documents: Vec<DocumentMeta>,
    ) -> Result<GenerativeEnrichment, TeleClassError> {
        let enricher = self.generative_enricher();
        let Some(cache) = &self.cache else {
            return Ok(enricher
                .enrich(self.enriched_classes.clone(), documents)
                .await?);
        };

        let cached_terms = load_or_miss(cache.load_class_terms(), "class terms");
        let cached_assignments = load_or_miss(cache.load_assignments(), "assignments");

        match (cached_terms, cached_assignments) {
            (Some(classes), Some(tagged)) => {
                info!(classes = classes.len(), documents = tagged.len(), "Reusing cached terms and assignments");
                Ok(GenerativeEnrichment {
                    classes,
                    documents: tagged,
                })
            }
            (Some(classes), None) => {
                info!(classes = classes.len(), "Reusing cached terms, assigning core classes");
                let tagged = enricher.assign_core_classes(documents, &classes).await;
                save_or_warn(cache.save_assignments(&tagged), "assignments");
                Ok(GenerativeEnrichment {
                    classes,
                    documents: tagged,
                })
            }
            (None, _) => {
                info!("No cached terms, running full generative enrichment");
                let classes = enricher.enrich_classes(self.enriched_classes.clone()).await;
                save_or_warn(cache.save_class_terms(&classes), "class terms");
                let tagged = enricher.assign_core_classes(documents, &classes).await;
                save_or_warn(cache.save_assignments(&tagged), "assignments");
                Ok(GenerativeEnrichment {
                    classes,
                    documents: tagged,
                })
            }
        }
    }

    fn generative_enricher(&self) -> GenerativeEnricher {
        GenerativeEnricher::new(
            self.generator.clone(),
            self.embedder.clone(),
            self.taxonomy.clone(),
            GenerativeConfig::from_settings(&self.settings.llm, &self.settings.pipeline),
        )
    }

    fn corpus_enricher(&self) -> CorpusEnricher {
        CorpusEnricher::new(
            self.embedder.clone(),
            self.taxonomy.clone(),
            build_extractor(&self.settings.corpus, self.embedder.clone()),
            CorpusConfig::from(&self.settings.corpus),
        )
    }

    /// Union corpus terms into the generative classes, then rebuild the
    /// term matrix of every class whose terms changed.
    fn merge(&self, mut generated: EnrichedClasses, corpus: EnrichedClasses) -> EnrichedClasses {
        let policy = self.settings.pipeline.merge_policy;
        for (name, class) in corpus {
            let changed = generated
                .entry(name.clone())
                .or_insert_with(|| EnrichedClass::new(name.clone(), class.class_description.clone()))
                .merge_terms(class.terms, policy);
            debug!(class = %name, changed = changed, "Merged corpus terms");
        }

        for class in generated.values_mut() {
            if class.embeddings.is_some() || class.terms.is_empty() {
                continue;
            }
            match self.embedder.embed_texts(&class.term_names()) {
                Ok(rows) => class.embeddings = Some(rows),
                Err(e) => warn!(class = %class.class_name, error = %e, "Failed to embed merged terms"),
            }
        }
        generated
    }

    /// Classes on the predicted path for `text`.
    pub fn predict(&self, text: &str) -> Result<BTreeSet<String>, TeleClassError> {
        let classifier = self.classifier.as_ref().ok_or(TeleClassError::NotTrained)?;
        Ok(classifier.predict(text)?)
    }

    /// Classify every document from `source` into taxonomy leaves.
    ///
    /// Trains on the loaded documents first if no classifier exists yet.
    #[instrument(skip_all)]
    pub async fn classify_documents(
        &mut self,
        source: &DocumentSource,
    ) -> Result<ClassificationResult, TeleClassError> {
        let documents = load_documents(source, self.embedder.as_ref())?;
        info!(documents = documents.len(), "Loaded documents for classification");

        if self.classifier.is_none() {
            self.run(documents.clone()).await?;
        }
        let classifier = self.classifier.as_ref().ok_or(TeleClassError::NotTrained)?;

        let leaves = self.taxonomy.leaf_nodes();
        let mut result = ClassificationResult::new(self.settings.taxonomy_metadata.name.clone());

        for doc in documents {
            let path = classifier.predict_embedding(&doc.embedding);
            debug!(document = %doc.id, path = ?path, "Predicted classes");

            for leaf in path.intersection(&leaves) {
                if !result.parent_classes.contains_key(leaf) {
                    result
                        .parent_classes
                        .insert(leaf.clone(), self.taxonomy.ancestors(leaf)?);
                }
                result
                    .classification_result
                    .entry(leaf.clone())
                    .or_default()
                    .push(doc.clone());
            }
        }

        info!(leaves = result.classification_result.len(), "Classification complete");
        Ok(result)
    }

    /// Remove cached artifacts, if caching is enabled.
    pub fn clear_cache(&self) -> Result<(), TeleClassError> {
        if let Some(cache) = &self.cache {
            cache.clear()?;
        }
        Ok(())
    }
}

fn load_or_miss<T>(
    loaded: Result<Option<T>, teleclass_cache::CacheError>,
    artifact: &str,
) -> Option<T> {
    loaded.unwrap_or_else(|e| {
        warn!(artifact = artifact, error = %e, "Unreadable cache artifact, treating as miss");
        None
    })
}

fn save_or_warn(saved: Result<(), teleclass_cache::CacheError>, artifact: &str) {
    if let Err(e) = saved {
        warn!(artifact = artifact, error = %e, "Failed to write cache artifact");
    }
}
