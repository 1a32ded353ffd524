//! Candidate phrase extraction.
//!
//! Corpus enrichment concatenates a class's documents and asks a
//! [`PhraseExtractor`] for the best few phrases in the result. Two
//! interchangeable strategies are provided.

mod embedding;
mod statistical;

use std::sync::Arc;

use teleclass_embeddings::EmbeddingModel;
use teleclass_types::{CorpusSettings, PhraseExtractorKind};

use crate::error::EnrichmentError;

pub use embedding::EmbeddingRankedExtractor;
pub use statistical::StatisticalExtractor;

/// Picks key phrases out of a text.
pub trait PhraseExtractor: Send + Sync {
    /// Up to `top_n` lowercase phrases, best first, without duplicates.
    fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, EnrichmentError>;
}

/// Build the extractor selected in `settings`.
pub fn build_extractor(
    settings: &CorpusSettings,
    embedder: Arc<dyn EmbeddingModel>,
) -> Box<dyn PhraseExtractor> {
    match settings.phrase_extractor {
        PhraseExtractorKind::Statistical => {
            Box::new(StatisticalExtractor::new(settings.max_ngram))
        }
        PhraseExtractorKind::EmbeddingRanked => Box::new(EmbeddingRankedExtractor::new(
            embedder,
            settings.max_ngram,
            settings.max_candidates,
        )),
    }
}

/// Contiguous n-grams of `tokens`, lengths 1 to `max_n`.
pub(crate) fn ngrams(tokens: &[String], max_n: usize) -> Vec<Vec<String>> {
    let mut grams = Vec::new();
    for n in 1..=max_n.max(1) {
        for window in tokens.windows(n) {
            grams.push(window.to_vec());
        }
    }
    grams
}
