//! Statistical keyword extraction from a single text.
//!
//! Each content word gets a weight from five features: casing, position of
//! the sentences it occurs in, normalized frequency, context diversity of
//! its neighbours, and how many sentences it spreads over. Lower weights
//! mean more important words. Phrases of up to `max_ngram` words are scored
//! from their words' weights and their own frequency, then near-duplicates
//! are suppressed.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::EnrichmentError;
use crate::phrases::PhraseExtractor;
use crate::tokenize::{is_numeric, is_stop_word, word_spans};

/// Phrases at least this similar to an already selected phrase are dropped.
const DEDUP_THRESHOLD: f64 = 0.9;

/// Single-document keyword extractor.
#[derive(Debug, Clone)]
pub struct StatisticalExtractor {
    max_ngram: usize,
}

impl StatisticalExtractor {
    pub fn new(max_ngram: usize) -> Self {
        Self {
            max_ngram: max_ngram.max(1),
        }
    }
}

impl Default for StatisticalExtractor {
    fn default() -> Self {
        Self::new(3)
    }
}

#[derive(Debug)]
struct Token {
    raw: String,
    lower: String,
    stop: bool,
    /// Only whitespace separates this token from the previous one
    joined: bool,
}

#[derive(Debug, Default)]
struct WordStats {
    tf: f64,
    tf_upper: f64,
    tf_acronym: f64,
    sentences: Vec<usize>,
    left: HashMap<String, usize>,
    right: HashMap<String, usize>,
}

/// Sentences of word tokens.
///
/// `.`, `!` and `?` end a sentence. Any other punctuation between two words
/// (quotes, colons, commas, brackets) keeps them in the same sentence but
/// stops a phrase from spanning the gap.
fn split_sentences(text: &str) -> Vec<Vec<Token>> {
    let mut sentences = Vec::new();
    for line in text.lines() {
        let mut current: Vec<Token> = Vec::new();
        let mut prev_end = 0;
        for span in word_spans(line) {
            let gap = &line[prev_end..span.start];
            prev_end = span.end;
            if gap.contains(['.', '!', '?']) && !current.is_empty() {
                sentences.push(std::mem::take(&mut current));
            }

            let joined = !current.is_empty() && gap.chars().all(char::is_whitespace);
            let raw = &line[span];
            let lower = raw.to_lowercase();
            let stop = lower.chars().count() < 2 || is_stop_word(&lower) || is_numeric(&lower);
            current.push(Token {
                raw: raw.to_string(),
                lower,
                stop,
                joined,
            });
        }
        if !current.is_empty() {
            sentences.push(current);
        }
    }
    sentences
}

fn is_acronym(raw: &str) -> bool {
    raw.chars().count() > 1
        && raw.chars().any(char::is_alphabetic)
        && raw
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

fn word_stats(sentences: &[Vec<Token>]) -> HashMap<String, WordStats> {
    let mut stats: HashMap<String, WordStats> = HashMap::new();

    for (s_idx, sentence) in sentences.iter().enumerate() {
        for (i, token) in sentence.iter().enumerate() {
            if token.stop {
                continue;
            }
            let entry = stats.entry(token.lower.clone()).or_default();
            entry.tf += 1.0;
            if is_acronym(&token.raw) {
                entry.tf_acronym += 1.0;
            } else if i > 0 && token.raw.chars().next().is_some_and(char::is_uppercase) {
                entry.tf_upper += 1.0;
            }
            entry.sentences.push(s_idx);

            if let Some(left) = i.checked_sub(1).and_then(|j| sentence.get(j)) {
                if !left.stop {
                    *entry.left.entry(left.lower.clone()).or_insert(0) += 1;
                }
            }
            if let Some(right) = sentence.get(i + 1) {
                if !right.stop {
                    *entry.right.entry(right.lower.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    stats
}

fn median(values: &[usize]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

fn dispersion(neighbours: &HashMap<String, usize>) -> f64 {
    let total: usize = neighbours.values().sum();
    if total == 0 {
        0.0
    } else {
        neighbours.len() as f64 / total as f64
    }
}

/// Per-word weight; lower is more important.
fn word_weights(stats: &HashMap<String, WordStats>, n_sentences: usize) -> HashMap<String, f64> {
    let tfs: Vec<f64> = stats.values().map(|s| s.tf).collect();
    let n = tfs.len().max(1) as f64;
    let mean = tfs.iter().sum::<f64>() / n;
    let std = (tfs.iter().map(|tf| (tf - mean).powi(2)).sum::<f64>() / n).sqrt();
    let max_tf = tfs.iter().copied().fold(1.0, f64::max);

    stats
        .iter()
        .map(|(word, s)| {
            let t_case = s.tf_upper.max(s.tf_acronym) / (1.0 + s.tf.ln());
            let t_pos = (3.0 + median(&s.sentences)).ln().ln();
            let t_norm = s.tf / (mean + std);
            let t_rel = 1.0 + (dispersion(&s.left) + dispersion(&s.right)) * s.tf / max_tf;
            let distinct: BTreeSet<&usize> = s.sentences.iter().collect();
            let t_sent = distinct.len() as f64 / n_sentences.max(1) as f64;

            let weight = (t_rel * t_pos) / (t_case + t_norm / t_rel + t_sent / t_rel);
            (word.clone(), weight)
        })
        .collect()
}

/// Edit-distance similarity in [0, 1].
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    1.0 - prev[b.len()] as f64 / longest as f64
}

impl StatisticalExtractor {
    /// All candidate phrases with their scores, best (lowest) first.
    fn scored_candidates(&self, text: &str) -> Vec<(String, f64)> {
        let sentences = split_sentences(text);
        let stats = word_stats(&sentences);
        if stats.is_empty() {
            return Vec::new();
        }
        let weights = word_weights(&stats, sentences.len());

        let mut phrase_tf: HashMap<String, (f64, Vec<String>)> = HashMap::new();
        for sentence in &sentences {
            for n in 1..=self.max_ngram {
                for window in sentence.windows(n) {
                    let (Some(first), Some(last)) = (window.first(), window.last()) else {
                        continue;
                    };
                    if first.stop
                        || last.stop
                        || window.iter().skip(1).any(|t| !t.joined)
                        || window.iter().any(|t| is_numeric(&t.lower))
                    {
                        continue;
                    }
                    let key = window
                        .iter()
                        .map(|t| t.lower.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    let entry = phrase_tf.entry(key).or_insert_with(|| {
                        (
                            0.0,
                            window
                                .iter()
                                .filter(|t| !t.stop)
                                .map(|t| t.lower.clone())
                                .collect(),
                        )
                    });
                    entry.0 += 1.0;
                }
            }
        }

        let mut scored: Vec<(String, f64)> = phrase_tf
            .into_iter()
            .map(|(phrase, (tf, words))| {
                let ws: Vec<f64> = words
                    .iter()
                    .filter_map(|w| weights.get(w).copied())
                    .collect();
                let product: f64 = ws.iter().product();
                let sum: f64 = ws.iter().sum();
                (phrase, product / (tf * (1.0 + sum)))
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        scored
    }
}

impl PhraseExtractor for StatisticalExtractor {
    fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, EnrichmentError> {
        let mut selected: Vec<String> = Vec::with_capacity(top_n);
        for (phrase, score) in self.scored_candidates(text) {
            if selected.len() >= top_n {
                break;
            }
            if selected
                .iter()
                .any(|s| similarity(s, &phrase) > DEDUP_THRESHOLD)
            {
                continue;
            }
            debug!(phrase = %phrase, score = score, "Selected phrase");
            selected.push(phrase);
        }
        Ok(selected)
    }
}
