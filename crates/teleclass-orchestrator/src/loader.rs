//! Document loading.
//!
//! Both loaders turn JSON objects into [`DocumentMeta`]: the content is the
//! record's compact JSON text and the embedding is computed from it. The
//! document id is the record's `id` field when it is a string or number,
//! otherwise the record's position in the input.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use teleclass_embeddings::{EmbeddingError, EmbeddingModel};
use teleclass_types::{DocumentMeta, DocumentSource};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("JSON file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON file must contain a list of documents")]
    NotAList,

    #[error("Record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("Failed to embed documents: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Produces embedded documents from some source.
pub trait DocumentLoader {
    fn load(&self, embedder: &dyn EmbeddingModel) -> Result<Vec<DocumentMeta>, LoaderError>;
}

/// Loads a file holding a JSON array of objects.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentLoader for JsonFileLoader {
    fn load(&self, embedder: &dyn EmbeddingModel) -> Result<Vec<DocumentMeta>, LoaderError> {
        if !self.path.exists() {
            return Err(LoaderError::NotFound(self.path.clone()));
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| LoaderError::Io {
            path: self.path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| LoaderError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let Value::Array(records) = value else {
            return Err(LoaderError::NotAList);
        };

        info!(path = ?self.path, records = records.len(), "Loaded JSON documents");
        embed_records(&records, embedder)
    }
}

/// Loads in-memory structured records.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    records: Vec<Value>,
}

impl RecordLoader {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }
}

impl DocumentLoader for RecordLoader {
    fn load(&self, embedder: &dyn EmbeddingModel) -> Result<Vec<DocumentMeta>, LoaderError> {
        debug!(records = self.records.len(), "Loading structured records");
        embed_records(&self.records, embedder)
    }
}

/// Load any [`DocumentSource`].
pub fn load_documents(
    source: &DocumentSource,
    embedder: &dyn EmbeddingModel,
) -> Result<Vec<DocumentMeta>, LoaderError> {
    match source {
        DocumentSource::JsonFile(path) => JsonFileLoader::new(path.clone()).load(embedder),
        DocumentSource::Records(records) => embed_records(records, embedder),
    }
}

fn record_id(record: &serde_json::Map<String, Value>, index: usize) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => index.to_string(),
    }
}

fn embed_records(
    records: &[Value],
    embedder: &dyn EmbeddingModel,
) -> Result<Vec<DocumentMeta>, LoaderError> {
    let mut ids = Vec::with_capacity(records.len());
    let mut contents = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(LoaderError::NotAnObject { index });
        };
        ids.push(record_id(fields, index));
        contents.push(record.to_string());
    }

    let embeddings = embedder.embed_texts(&contents)?;
    if embeddings.len() != contents.len() {
        return Err(LoaderError::Embedding(EmbeddingError::MissingVector {
            index: embeddings.len(),
        }));
    }

    Ok(ids
        .into_iter()
        .zip(contents)
        .zip(embeddings)
        .map(|((id, content), embedding)| DocumentMeta::new(id, content, embedding))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use teleclass_embeddings::{Embedding, ModelInfo};
    use tempfile::TempDir;

    struct LengthEmbedder {
        info: ModelInfo,
    }

    impl LengthEmbedder {
        fn new() -> Self {
            Self {
                info: ModelInfo {
                    name: "length".to_string(),
                    dimension: 2,
                    max_sequence_length: 512,
                },
            }
        }
    }

    impl EmbeddingModel for LengthEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            Ok(Embedding::new(vec![text.len() as f32, 1.0]))
        }
    }

    #[test]
    fn test_records_become_documents() {
        let source = DocumentSource::from(vec![
            json!({"id": "pm10-a", "name": "PM10 sensor"}),
            json!({"id": 7, "name": "bus counter"}),
            json!({"name": "no id"}),
        ]);
        let docs = load_documents(&source, &LengthEmbedder::new()).unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["pm10-a", "7", "2"]);
        assert_eq!(docs[0].content, r#"{"id":"pm10-a","name":"PM10 sensor"}"#);
        assert!(docs.iter().all(|d| d.initial_core_classes.is_none()));
        assert_eq!(docs[0].embedding.dimension(), 2);
    }

    #[test]
    fn test_non_object_record_rejected() {
        let loader = RecordLoader::new(vec![json!({"a": 1}), json!("text")]);
        let err = loader.load(&LengthEmbedder::new()).unwrap_err();
        assert!(matches!(err, LoaderError::NotAnObject { index: 1 }));
    }

    #[test]
    fn test_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(&path, r#"[{"name": "ozone"}, {"name": "pm10"}]"#).unwrap();

        let docs = load_documents(&DocumentSource::json_file(&path), &LengthEmbedder::new()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id, "1");
    }

    #[test]
    fn test_json_file_errors() {
        let dir = TempDir::new().unwrap();
        let embedder = LengthEmbedder::new();

        let missing = JsonFileLoader::new(dir.path().join("missing.json"));
        assert!(matches!(missing.load(&embedder), Err(LoaderError::NotFound(_))));

        let path = dir.path().join("object.json");
        std::fs::write(&path, r#"{"name": "ozone"}"#).unwrap();
        assert!(matches!(
            JsonFileLoader::new(&path).load(&embedder),
            Err(LoaderError::NotAList)
        ));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{").unwrap();
        assert!(matches!(
            JsonFileLoader::new(&path).load(&embedder),
            Err(LoaderError::Parse { .. })
        ));
    }
}
