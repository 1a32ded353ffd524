//! Documents and classification results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use teleclass_embeddings::Embedding;

use crate::error::TypesError;

/// A document prepared for enrichment or classification.
///
/// `initial_core_classes` is `None` until generative enrichment (or a cache
/// load) has tagged the document. `Some` of an empty set means the tagging
/// ran and produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub content: String,
    pub embedding: Embedding,
    #[serde(default)]
    pub initial_core_classes: Option<BTreeSet<String>>,
}

impl DocumentMeta {
    /// Create an untagged document.
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            initial_core_classes: None,
        }
    }

    /// Builder: set the core classes.
    pub fn with_core_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_core_classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `class` is among this document's core classes.
    pub fn is_tagged_with(&self, class: &str) -> bool {
        self.initial_core_classes
            .as_ref()
            .is_some_and(|classes| classes.contains(class))
    }
}

/// Documents grouped by assigned leaf, with each leaf's ancestors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Label of the taxonomy attribute these classes describe.
    pub attribute_label: String,
    /// Leaf class -> documents assigned to it.
    pub classification_result: BTreeMap<String, Vec<DocumentMeta>>,
    /// Leaf class -> every taxonomy ancestor of that leaf.
    pub parent_classes: BTreeMap<String, BTreeSet<String>>,
}

impl ClassificationResult {
    pub fn new(attribute_label: impl Into<String>) -> Self {
        Self {
            attribute_label: attribute_label.into(),
            ..Default::default()
        }
    }

    /// No document was assigned to any leaf.
    pub fn is_empty(&self) -> bool {
        self.classification_result.is_empty()
    }

    /// Documents assigned to `leaf`, empty if none.
    pub fn documents_for(&self, leaf: &str) -> &[DocumentMeta] {
        self.classification_result
            .get(leaf)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Where documents to classify come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Path to a file holding a JSON array of objects.
    JsonFile(PathBuf),
    /// Structured records already in memory.
    Records(Vec<serde_json::Value>),
}

impl DocumentSource {
    /// Source from any serializable records.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, TypesError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Records(values))
    }

    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self::JsonFile(path.into())
    }
}

impl From<Vec<serde_json::Value>> for DocumentSource {
    fn from(records: Vec<serde_json::Value>) -> Self {
        Self::Records(records)
    }
}
