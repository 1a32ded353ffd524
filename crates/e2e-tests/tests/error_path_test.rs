//! Error paths through the public pipeline API.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{sensor_generator, sensor_records, sensor_taxonomy, KeywordEmbedder, TestHarness, SENSOR_VOCAB};
use teleclass_embeddings::{Embedding, EmbeddingModel};
use teleclass_enrichment::{CorpusConfig, CorpusEnricher, EnrichmentError, StatisticalExtractor};
use teleclass_llm::MockGenerator;
use teleclass_orchestrator::{LoaderError, TeleClassError};
use teleclass_taxonomy::{Taxonomy, TaxonomyError};
use teleclass_types::{DocumentMeta, DocumentSource, TaxonomyNode};

fn embedder() -> Arc<KeywordEmbedder> {
    Arc::new(KeywordEmbedder::new(SENSOR_VOCAB))
}

#[test]
fn test_predict_before_training() {
    let harness = TestHarness::new();
    let teleclass = harness
        .teleclass(harness.settings(), embedder(), Arc::new(sensor_generator()))
        .unwrap();

    assert!(!teleclass.is_trained());
    assert!(matches!(
        teleclass.predict("pm10 sensor"),
        Err(TeleClassError::NotTrained)
    ));
}

#[tokio::test]
async fn test_empty_records_give_empty_result() {
    let harness = TestHarness::new();
    let mut teleclass = harness
        .teleclass(harness.settings(), embedder(), Arc::new(sensor_generator()))
        .unwrap();

    let result = teleclass
        .classify_documents(&DocumentSource::from(Vec::new()))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.attribute_label, "sensor_type");
    assert!(teleclass.is_trained());
}

#[tokio::test]
async fn test_bad_document_sources() {
    let harness = TestHarness::new();
    let mut teleclass = harness
        .teleclass(harness.settings(), embedder(), Arc::new(sensor_generator()))
        .unwrap();

    let missing = harness.cache_dir.with_file_name("missing.json");
    let err = teleclass
        .classify_documents(&DocumentSource::json_file(&missing))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TeleClassError::DocumentSource(LoaderError::NotFound(_))
    ));

    let object = harness.cache_dir.with_file_name("object.json");
    std::fs::write(&object, r#"{"id": "d1", "name": "pm10 sensor"}"#).unwrap();
    let err = teleclass
        .classify_documents(&DocumentSource::json_file(&object))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TeleClassError::DocumentSource(LoaderError::NotAList)
    ));

    let err = teleclass
        .classify_documents(&DocumentSource::from(vec![serde_json::json!(42)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TeleClassError::DocumentSource(LoaderError::NotAnObject { index: 0 })
    ));
    assert!(!teleclass.is_trained());
}

#[test]
fn test_invalid_taxonomies_rejected() {
    let harness = TestHarness::new();

    let mut settings = harness.settings();
    settings.taxonomy = Vec::new();
    let err = harness
        .teleclass(settings, embedder(), Arc::new(sensor_generator()))
        .err()
        .unwrap();
    assert!(matches!(err, TeleClassError::Taxonomy(TaxonomyError::TooFewNodes)));

    let mut settings = harness.settings();
    settings.taxonomy = vec![TaxonomyNode::described(
        "A",
        "",
        vec![TaxonomyNode::described("B", "", vec![TaxonomyNode::leaf("A")])],
    )];
    let err = harness
        .teleclass(settings, embedder(), Arc::new(sensor_generator()))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        TeleClassError::Taxonomy(TaxonomyError::CycleDetected { .. })
    ));
}

#[test]
fn test_invalid_settings_rejected() {
    let harness = TestHarness::new();
    let mut settings = harness.settings();
    settings.llm.temperature = 5.0;

    let err = harness
        .teleclass(settings, embedder(), Arc::new(sensor_generator()))
        .err()
        .unwrap();
    assert!(matches!(err, TeleClassError::Config(_)));
}

#[test]
fn test_corpus_enrichment_requires_core_classes() {
    let embedder = embedder();
    let taxonomy = Arc::new(Taxonomy::from_definition(&sensor_taxonomy()).unwrap());
    let enricher = CorpusEnricher::new(
        embedder.clone(),
        taxonomy,
        Box::new(StatisticalExtractor::default()),
        CorpusConfig::default(),
    );

    let docs = vec![
        DocumentMeta::new("tagged", "pm10 sensor", embedder.embed("pm10 sensor").unwrap())
            .with_core_classes(["A", "A1"]),
        DocumentMeta::new("untagged", "bus", Embedding::new(vec![0.0; 9])),
    ];
    let err = enricher.enrich(&docs).unwrap_err();
    assert!(matches!(
        err,
        EnrichmentError::MissingCoreClasses { ref document_id } if document_id == "untagged"
    ));
}

#[tokio::test]
async fn test_unreachable_generator_degrades() {
    let harness = TestHarness::new();
    let generator = Arc::new(MockGenerator::failing());
    let mut teleclass = harness
        .teleclass(harness.settings(), embedder(), generator.clone())
        .unwrap();

    let result = teleclass
        .classify_documents(&DocumentSource::from(sensor_records()))
        .await
        .unwrap();

    assert!(teleclass.is_trained());
    assert!(teleclass
        .enriched_classes()
        .values()
        .all(|class| class.terms.is_empty()));
    // Every document still lands in exactly one leaf.
    let classified: usize = result.classification_result.values().map(Vec::len).sum();
    assert_eq!(classified, 4);
}
