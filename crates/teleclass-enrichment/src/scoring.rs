//! Term scoring signals: popularity and distinctiveness.

use crate::bm25::Bm25Okapi;
use crate::tokenize::{normalize, words};

/// Added to the softmax denominator.
const SOFTMAX_EPSILON: f64 = 1e-10;

/// `ln(1 + df)`, where `df` counts documents containing `term`.
///
/// Both sides are reduced to their lowercase words first. Single words must
/// match a whole word; multi-word phrases match as a substring of the
/// document's word sequence.
pub fn popularity<S: AsRef<str>>(term: &str, documents: &[S]) -> f64 {
    let term_words = words(term);
    let phrase = term_words.join(" ");
    if phrase.is_empty() {
        return 0.0;
    }

    let df = documents
        .iter()
        .filter(|doc| {
            if term_words.len() == 1 {
                words(doc.as_ref()).contains(&phrase)
            } else {
                normalize(doc.as_ref()).contains(&phrase)
            }
        })
        .count();

    (1.0 + df as f64).ln()
}

/// Replace spaces with `_` so a phrase scores as one token.
pub fn fold_phrase(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Words of `doc` with every occurrence of `term` folded into one token.
pub fn fold_document(doc: &str, term: &str) -> Vec<String> {
    let doc = normalize(doc);
    let phrase = normalize(term);
    if phrase.contains(' ') && doc.contains(&phrase) {
        doc.replace(&phrase, &fold_phrase(&phrase))
            .split(' ')
            .map(String::from)
            .collect()
    } else {
        words(&doc)
    }
}

/// Numerically stable softmax: shift by the max, epsilon in the denominator.
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let Some(max) = scores.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let denom = exps.iter().sum::<f64>() + SOFTMAX_EPSILON;
    exps.into_iter().map(|e| e / denom).collect()
}

/// Mean BM25 score of the folded `term` over one corpus.
///
/// Every document of the corpus contributes to the mean, not just the
/// first one, so a class whose first document happens to lack the term is
/// not scored as zero.
pub fn corpus_relevance<S: AsRef<str>>(term: &str, corpus: &[S]) -> f64 {
    let term = normalize(term);
    let token = fold_phrase(&term);
    let tokenized: Vec<Vec<String>> = corpus
        .iter()
        .map(|doc| fold_document(doc.as_ref(), &term))
        .collect();
    Bm25Okapi::new(&tokenized).mean_score(&[token.as_str()])
}

/// Softmax shares of `term` across `corpora`, in input order.
pub fn relevance_shares<S: AsRef<str>>(term: &str, corpora: &[&[S]]) -> Vec<f64> {
    let scores: Vec<f64> = corpora
        .iter()
        .map(|corpus| corpus_relevance(term, corpus))
        .collect();
    softmax(&scores)
}

/// Share of `term`'s relevance owned by `class_docs` against each sibling
/// corpus.
///
/// A relative score: the same term gets a different value when the set of
/// sibling corpora changes. Corpora are not length-normalized against each
/// other beyond BM25's own document-length term.
pub fn distinctiveness<S: AsRef<str>>(term: &str, class_docs: &[S], siblings: &[Vec<S>]) -> f64 {
    let mut corpora: Vec<&[S]> = Vec::with_capacity(siblings.len() + 1);
    corpora.push(class_docs);
    corpora.extend(siblings.iter().map(Vec::as_slice));
    relevance_shares(term, &corpora)
        .first()
        .copied()
        .unwrap_or(0.0)
}
