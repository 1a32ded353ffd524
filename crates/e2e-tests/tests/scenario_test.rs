//! End-to-end classification scenario.
//!
//! Taxonomy `A -> {A1, A2}`, `B`; scripted generator and keyword embedder.

use std::collections::BTreeSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{
    ids_by_leaf, sensor_generator, sensor_records, sensor_taxonomy, tagged_document,
    KeywordEmbedder, TestHarness, SENSOR_VOCAB,
};
use teleclass_enrichment::{CorpusConfig, CorpusEnricher, StatisticalExtractor};
use teleclass_taxonomy::Taxonomy;
use teleclass_types::{DocumentSource, TermScore};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Corpus enrichment run directly on documents tagged with `A`.
#[test]
fn test_corpus_popularity_prefers_frequent_term() {
    let embedder = Arc::new(KeywordEmbedder::new(SENSOR_VOCAB));
    let taxonomy = Arc::new(Taxonomy::from_definition(&sensor_taxonomy()).unwrap());
    let enricher = CorpusEnricher::new(
        embedder.clone(),
        taxonomy,
        Box::new(StatisticalExtractor::default()),
        CorpusConfig { top_n: 5, top_k: 10 },
    );

    let docs = vec![
        tagged_document(embedder.as_ref(), "1", "The air sensor sits on the roof.", &["A"]),
        tagged_document(embedder.as_ref(), "2", "Each sensor reports hourly.", &["A"]),
        tagged_document(embedder.as_ref(), "3", "A calibrated sensor near the park.", &["A"]),
    ];
    let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();

    let scored = enricher.score_terms(
        "A",
        &["sensor".to_string(), "firmware".to_string()],
        &contents,
        &[],
    );
    let sensor = scored.get(&TermScore::new("sensor")).unwrap();
    let firmware = scored.get(&TermScore::new("firmware")).unwrap();
    assert_eq!(firmware.popularity, Some(0.0));
    assert!(sensor.popularity > firmware.popularity);

    let classes = enricher.enrich(&docs).unwrap();
    assert_eq!(classes.keys().cloned().collect::<Vec<_>>(), vec!["A".to_string()]);
    assert!(classes["A"].terms.len() <= 5);
    assert!(classes["A"].terms.iter().all(TermScore::is_scored));
    assert_eq!(classes["A"].class_description, "air quality monitoring");
}

#[tokio::test]
async fn test_end_to_end_classification() {
    let harness = TestHarness::new();
    let generator = Arc::new(sensor_generator());
    let mut teleclass = harness
        .teleclass(
            harness.settings(),
            Arc::new(KeywordEmbedder::new(SENSOR_VOCAB)),
            generator.clone(),
        )
        .unwrap();

    let result = teleclass
        .classify_documents(&DocumentSource::from(sensor_records()))
        .await
        .unwrap();

    assert!(teleclass.is_trained());
    assert_eq!(result.attribute_label, "sensor_type");

    let by_leaf = ids_by_leaf(&result);
    assert!(by_leaf["A1"].contains(&"d4".to_string()));
    assert!(by_leaf["A2"].contains(&"d2".to_string()));
    assert_eq!(by_leaf["B"], vec!["d3".to_string()]);

    assert_eq!(result.parent_classes["A1"], set(&["A"]));
    assert_eq!(result.parent_classes["B"], BTreeSet::new());
    assert!(!by_leaf.contains_key("A"));

    // One term request per class, one core-class request per document.
    assert_eq!(generator.calls(), 8);

    let path = teleclass
        .predict("pm10 particulate sensor near the air intake")
        .unwrap();
    assert_eq!(path, set(&["A", "A1"]));
}

#[tokio::test]
async fn test_generated_terms_survive_merge() {
    let harness = TestHarness::new();
    let mut teleclass = harness
        .teleclass(
            harness.settings(),
            Arc::new(KeywordEmbedder::new(SENSOR_VOCAB)),
            Arc::new(sensor_generator()),
        )
        .unwrap();
    teleclass
        .classify_documents(&DocumentSource::from(sensor_records()))
        .await
        .unwrap();

    let classes = teleclass.enriched_classes();
    assert_eq!(classes.len(), 4);
    for (class, term) in [("A", "sensor"), ("A1", "pm10"), ("A2", "ozone"), ("B", "bus")] {
        assert!(classes[class].term(term).is_some(), "{class} lost {term}");
        assert!(classes[class].embeddings.is_some(), "{class} has no term matrix");
    }

    // Records are stored as JSON text; terms mined from them must be words.
    for (class, enriched) in classes.iter() {
        for term in enriched.term_names() {
            assert!(!term.contains(['"', ':', '{', '}']), "{class} has term {term:?}");
            assert!(
                term.split(' ')
                    .all(|w| !w.is_empty() && w.chars().all(|c| c.is_alphanumeric() || c == '_')),
                "{class} has term {term:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_training_sample_size_caps_documents() {
    let harness = TestHarness::new();
    let generator = Arc::new(sensor_generator());
    let mut settings = harness.settings();
    settings.pipeline.training_sample_size = 2;
    let mut teleclass = harness
        .teleclass(
            settings,
            Arc::new(KeywordEmbedder::new(SENSOR_VOCAB)),
            generator.clone(),
        )
        .unwrap();

    let result = teleclass
        .classify_documents(&DocumentSource::from(sensor_records()))
        .await
        .unwrap();

    // Four term requests, two core-class requests; all four documents classified.
    assert_eq!(generator.calls(), 6);
    let classified: usize = result.classification_result.values().map(Vec::len).sum();
    assert_eq!(classified, 4);
}
