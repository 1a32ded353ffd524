//! Embedding-ranked keyword extraction.
//!
//! Candidates are stop-word-free n-grams of the text. Each candidate is
//! embedded and ranked by cosine similarity to the embedding of the whole
//! text; the final selection uses max-sum diversification: among the
//! `max_candidates` most similar candidates, pick the `top_n` that are least
//! similar to each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use teleclass_embeddings::{Embedding, EmbeddingModel};

use crate::error::EnrichmentError;
use crate::phrases::{ngrams, PhraseExtractor};
use crate::tokenize::tokenize;

/// Keyword extractor ranking candidates by document similarity.
pub struct EmbeddingRankedExtractor {
    embedder: Arc<dyn EmbeddingModel>,
    max_ngram: usize,
    max_candidates: usize,
}

impl EmbeddingRankedExtractor {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, max_ngram: usize, max_candidates: usize) -> Self {
        Self {
            embedder,
            max_ngram: max_ngram.max(1),
            max_candidates,
        }
    }

    fn candidates(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text);
        let unique: BTreeSet<String> = ngrams(&tokens, self.max_ngram)
            .into_iter()
            .map(|gram| gram.join(" "))
            .collect();
        unique.into_iter().collect()
    }
}

/// Indices of `k` rows minimizing the summed pairwise similarity.
///
/// Exhaustive over combinations; `rows` is bounded by `max_candidates`.
fn max_sum_selection(rows: &[Embedding], k: usize) -> Vec<usize> {
    let n = rows.len();
    if k >= n {
        return (0..n).collect();
    }
    if k == 0 {
        return Vec::new();
    }

    let mut pairwise = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let sim = rows[i].cosine_similarity(&rows[j]);
            pairwise[i][j] = sim;
            pairwise[j][i] = sim;
        }
    }

    let mut best: Option<(f32, Vec<usize>)> = None;
    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        let mut total = 0.0f32;
        for (a, &i) in combo.iter().enumerate() {
            for &j in &combo[a + 1..] {
                total += pairwise[i][j];
            }
        }
        if best.as_ref().map_or(true, |(score, _)| total < *score) {
            best = Some((total, combo.clone()));
        }

        // Advance to the next combination in lexicographic order.
        let Some(pos) = (0..k).rev().find(|&p| combo[p] != p + n - k) else {
            break;
        };
        combo[pos] += 1;
        for p in (pos + 1)..k {
            combo[p] = combo[p - 1] + 1;
        }
    }

    best.map(|(_, c)| c).unwrap_or_default()
}

impl PhraseExtractor for EmbeddingRankedExtractor {
    fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, EnrichmentError> {
        let candidates = self.candidates(text);
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let doc = self.embedder.embed(text)?;
        let embedded = self.embedder.embed_texts(&candidates)?;

        let mut ranked: Vec<(usize, f32)> = embedded
            .iter()
            .enumerate()
            .map(|(i, e)| (i, doc.cosine_similarity(e)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| candidates[a.0].cmp(&candidates[b.0]))
        });
        ranked.truncate(self.max_candidates.max(top_n));

        let pool: Vec<Embedding> = ranked.iter().map(|(i, _)| embedded[*i].clone()).collect();
        let mut chosen: Vec<(usize, f32)> = max_sum_selection(&pool, top_n)
            .into_iter()
            .map(|slot| ranked[slot])
            .collect();
        chosen.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(
            candidates = candidates.len(),
            selected = chosen.len(),
            "Ranked phrases by document similarity"
        );

        Ok(chosen
            .into_iter()
            .map(|(i, _)| candidates[i].clone())
            .collect())
    }
}
