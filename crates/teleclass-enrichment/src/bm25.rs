//! Okapi BM25 over pre-tokenized documents.
//!
//! IDF follows the Okapi variant: `ln(N - n + 0.5) - ln(n + 0.5)`. Terms that
//! appear in more than half the documents would get a negative IDF; those
//! are floored to `epsilon * average_idf` instead.

use std::collections::HashMap;

/// Term saturation
pub const K1: f64 = 1.5;
/// Length normalization
pub const B: f64 = 0.75;
/// Floor for negative IDF, as a fraction of the average IDF
pub const EPSILON: f64 = 0.25;

/// BM25 index over one corpus.
#[derive(Debug, Clone)]
pub struct Bm25Okapi {
    k1: f64,
    b: f64,
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_len: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Okapi {
    /// Index `corpus` with the default parameters.
    pub fn new<S: AsRef<str>>(corpus: &[Vec<S>]) -> Self {
        Self::with_params(corpus, K1, B, EPSILON)
    }

    pub fn with_params<S: AsRef<str>>(corpus: &[Vec<S>], k1: f64, b: f64, epsilon: f64) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_len = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.as_ref().to_string()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *containing.entry(term.clone()).or_insert(0) += 1;
            }
            doc_len.push(doc.len());
            doc_freqs.push(freqs);
        }

        let total_len: usize = doc_len.iter().sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / corpus.len() as f64
        };

        let n_docs = corpus.len() as f64;
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (term, n) in containing {
            let n = n as f64;
            let value = (n_docs - n + 0.5).ln() - (n + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let floor = epsilon * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            k1,
            b,
            doc_freqs,
            doc_len,
            avgdl,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_freqs.is_empty()
    }

    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// Score of `query` against every document, in corpus order.
    pub fn get_scores(&self, query: &[&str]) -> Vec<f64> {
        self.doc_freqs
            .iter()
            .zip(self.doc_len.iter())
            .map(|(freqs, &len)| {
                let norm = if self.avgdl > 0.0 {
                    len as f64 / self.avgdl
                } else {
                    1.0
                };
                query
                    .iter()
                    .map(|q| {
                        let f = freqs.get(*q).copied().unwrap_or(0) as f64;
                        self.idf(q) * (f * (self.k1 + 1.0))
                            / (f + self.k1 * (1.0 - self.b + self.b * norm))
                    })
                    .sum()
            })
            .collect()
    }

    /// Mean score of `query` across the corpus; 0.0 for an empty corpus.
    pub fn mean_score(&self, query: &[&str]) -> f64 {
        let scores = self.get_scores(query);
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
