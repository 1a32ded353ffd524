//! Term scores and enriched classes.
//!
//! A [`TermScore`] is identified by its term text alone: two values with the
//! same term but different scores are the same set element. Classes hold
//! their terms in a `BTreeSet`, so iteration order (and therefore the order
//! of rows in a term-embedding matrix) is deterministic.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use teleclass_embeddings::Embedding;

use crate::error::TypesError;

/// A candidate term with its three enrichment signals.
///
/// Scores stay `None` until corpus enrichment has computed them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermScore {
    pub term: String,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub distinctiveness: Option<f64>,
    #[serde(default)]
    pub semantic_similarity: Option<f64>,
}

impl TermScore {
    /// An unscored term, as produced by generative enrichment.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            popularity: None,
            distinctiveness: None,
            semantic_similarity: None,
        }
    }

    /// A fully scored term.
    pub fn scored(
        term: impl Into<String>,
        popularity: f64,
        distinctiveness: f64,
        semantic_similarity: f64,
    ) -> Self {
        Self {
            term: term.into(),
            popularity: Some(popularity),
            distinctiveness: Some(distinctiveness),
            semantic_similarity: Some(semantic_similarity),
        }
    }

    /// Whether all three component scores are set.
    pub fn is_scored(&self) -> bool {
        self.popularity.is_some()
            && self.distinctiveness.is_some()
            && self.semantic_similarity.is_some()
    }

    /// Geometric mean of popularity, distinctiveness and semantic similarity.
    ///
    /// A missing component is an error, never a zero: the score is meant to
    /// penalise terms that lack support from any one signal.
    pub fn affinity_score(&self) -> Result<f64, TypesError> {
        match (
            self.popularity,
            self.distinctiveness,
            self.semantic_similarity,
        ) {
            (Some(p), Some(d), Some(s)) => Ok((p * d * s).cbrt()),
            _ => Err(TypesError::ScoresNotReady {
                term: self.term.clone(),
            }),
        }
    }

    /// Term text and every score are equal.
    pub fn same_scores(&self, other: &TermScore) -> bool {
        self.term == other.term
            && self.popularity == other.popularity
            && self.distinctiveness == other.distinctiveness
            && self.semantic_similarity == other.semantic_similarity
    }
}

impl PartialEq for TermScore {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl Eq for TermScore {}

impl Hash for TermScore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state);
    }
}

impl PartialOrd for TermScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TermScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term.cmp(&other.term)
    }
}

/// How duplicate term names are resolved when term sets are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the entry already present, discard the incoming duplicate.
    FirstWins,
    /// Replace the present entry with the incoming one.
    #[default]
    LatestWins,
}

/// Enriched classes keyed by class name.
pub type EnrichedClasses = BTreeMap<String, EnrichedClass>;

/// A taxonomy class together with the terms gathered for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedClass {
    pub class_name: String,
    #[serde(default)]
    pub class_description: String,
    #[serde(default)]
    pub terms: BTreeSet<TermScore>,
    /// One row per term, in term order, when precomputed.
    #[serde(default)]
    pub embeddings: Option<Vec<Embedding>>,
}

impl EnrichedClass {
    /// A class with no terms yet.
    pub fn new(class_name: impl Into<String>, class_description: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            class_description: class_description.into(),
            terms: BTreeSet::new(),
            embeddings: None,
        }
    }

    /// A class holding `terms`.
    pub fn with_terms(
        class_name: impl Into<String>,
        terms: impl IntoIterator<Item = TermScore>,
    ) -> Self {
        let mut class = Self::new(class_name, "");
        class.terms.extend(terms);
        class
    }

    /// Term texts in set order.
    pub fn term_names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.term.clone()).collect()
    }

    /// Look up a term by text.
    pub fn term(&self, term: &str) -> Option<&TermScore> {
        self.terms.get(&TermScore::new(term))
    }

    /// Merge `incoming` into this class's terms.
    ///
    /// Returns how many entries were added or replaced. A precomputed
    /// embedding matrix no longer matches a changed term set, so it is
    /// dropped when anything changes.
    pub fn merge_terms(
        &mut self,
        incoming: impl IntoIterator<Item = TermScore>,
        policy: MergePolicy,
    ) -> usize {
        let mut changed = 0;
        for term in incoming {
            let present = self.terms.contains(&term);
            match (present, policy) {
                (false, _) => {
                    self.terms.insert(term);
                    changed += 1;
                }
                (true, MergePolicy::FirstWins) => {}
                (true, MergePolicy::LatestWins) => {
                    self.terms.replace(term);
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.embeddings = None;
        }
        changed
    }

    /// Name, description, term texts, scores and embeddings all equal.
    pub fn same_content(&self, other: &EnrichedClass) -> bool {
        self.class_name == other.class_name
            && self.class_description == other.class_description
            && self.terms.len() == other.terms.len()
            && self
                .terms
                .iter()
                .zip(other.terms.iter())
                .all(|(a, b)| a.same_scores(b))
            && self.embeddings == other.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_affinity_is_cube_root_of_product() {
        let t = TermScore::scored("sensor", 2.0, 0.5, 0.8);
        let expected = (2.0f64 * 0.5 * 0.8).cbrt();
        assert!((t.affinity_score().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_affinity_requires_every_component() {
        let mut t = TermScore::scored("sensor", 1.0, 1.0, 1.0);
        t.distinctiveness = None;
        let err = t.affinity_score().unwrap_err();
        assert!(matches!(err, TypesError::ScoresNotReady { ref term } if term == "sensor"));

        assert!(TermScore::new("bare").affinity_score().is_err());
    }

    #[test]
    fn test_affinity_zero_component_is_zero_not_error() {
        let t = TermScore::scored("firmware", 0.0, 0.9, 0.9);
        assert_eq!(t.affinity_score().unwrap(), 0.0);
    }

    #[test]
    fn test_identity_is_term_text_only() {
        let a = TermScore::scored("rain gauge", 1.0, 0.2, 0.3);
        let b = TermScore::new("rain gauge");
        assert_eq!(a, b);

        let set: HashSet<TermScore> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_merge_first_wins_keeps_existing_scores() {
        let mut class = EnrichedClass::with_terms("A", [TermScore::new("sensor")]);
        let changed = class.merge_terms(
            [TermScore::scored("sensor", 1.0, 1.0, 1.0)],
            MergePolicy::FirstWins,
        );
        assert_eq!(changed, 0);
        assert_eq!(class.terms.len(), 1);
        assert!(!class.term("sensor").unwrap().is_scored());
    }

    #[test]
    fn test_merge_latest_wins_replaces_scores() {
        let mut class = EnrichedClass::with_terms("A", [TermScore::new("sensor")]);
        let changed = class.merge_terms(
            [
                TermScore::scored("sensor", 1.0, 1.0, 1.0),
                TermScore::new("probe"),
            ],
            MergePolicy::LatestWins,
        );
        assert_eq!(changed, 2);
        assert_eq!(class.terms.len(), 2);
        assert!(class.term("sensor").unwrap().is_scored());
    }

    #[test]
    fn test_merge_drops_stale_embeddings_only_on_change() {
        let mut class = EnrichedClass::with_terms("A", [TermScore::new("sensor")]);
        class.embeddings = Some(vec![Embedding::new(vec![1.0, 0.0])]);

        class.merge_terms([TermScore::new("sensor")], MergePolicy::FirstWins);
        assert!(class.embeddings.is_some());

        class.merge_terms([TermScore::new("probe")], MergePolicy::FirstWins);
        assert!(class.embeddings.is_none());
    }

    #[test]
    fn test_terms_iterate_in_sorted_order() {
        let class = EnrichedClass::with_terms(
            "A",
            [TermScore::new("zeta"), TermScore::new("alpha")],
        );
        assert_eq!(class.term_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_same_content_compares_scores() {
        let a = EnrichedClass::with_terms("A", [TermScore::scored("x", 1.0, 0.5, 0.5)]);
        let b = EnrichedClass::with_terms("A", [TermScore::scored("x", 1.0, 0.4, 0.5)]);
        assert!(a.same_content(&a.clone()));
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_enriched_class_serialization() {
        let mut class = EnrichedClass::with_terms("A", [TermScore::scored("x", 1.0, 0.5, 0.5)]);
        class.embeddings = Some(vec![Embedding::from_normalized(vec![1.0, 0.0])]);
        let json = serde_json::to_string(&class).unwrap();
        let decoded: EnrichedClass = serde_json::from_str(&json).unwrap();
        assert!(class.same_content(&decoded));
    }
}
