//! The embedding capability.
//!
//! Every stage of the pipeline receives an `Arc<dyn EmbeddingModel>` at
//! construction time and never learns which model sits behind it.

use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::similarity::cosine_similarity;

/// A text vector, scaled to unit length on construction.
///
/// Serializes as a plain JSON array so cached term matrices stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Scale `values` to unit length. The zero vector is kept as is.
    pub fn new(values: Vec<f32>) -> Self {
        let length = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if length == 0.0 {
            return Self { values };
        }
        Self {
            values: values.into_iter().map(|v| v / length).collect(),
        }
    }

    /// Wrap `values` without rescaling.
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in `[-1, 1]`.
    ///
    /// Does not assume either side is normalized: embeddings reloaded from
    /// a cache or produced by a remote service may not be.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.values, &other.values)
    }
}

/// Static description of a model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    /// Length of every vector the model produces
    pub dimension: usize,
    /// Longer inputs are truncated, in tokens
    pub max_sequence_length: usize,
}

/// Turns text into fixed-dimension vectors.
///
/// Shared across concurrent enrichment tasks, hence `Send + Sync`.
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// One vector per input, in input order. Override when the model can
    /// batch natively.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// [`embed_batch`](Self::embed_batch) over owned strings.
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let borrowed: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.embed_batch(&borrowed)
    }

    /// Similarity between two embeddings. Cosine by convention.
    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        a.cosine_similarity(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder {
        info: ModelInfo,
    }

    impl EmbeddingModel for LengthEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            Ok(Embedding::new(vec![text.len() as f32, 1.0]))
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_new_scales_to_unit_length() {
        let emb = Embedding::new(vec![6.0, 8.0]);
        assert!(close(emb.values[0], 0.6));
        assert!(close(emb.values[1], 0.8));
        assert_eq!(emb.dimension(), 2);
    }

    #[test]
    fn test_zero_vector_is_left_alone() {
        let emb = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(emb.values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine_of_parallel_and_antiparallel() {
        let east = Embedding::new(vec![2.0, 0.0, 0.0]);
        let also_east = Embedding::new(vec![5.0, 0.0, 0.0]);
        let west = Embedding::new(vec![-1.0, 0.0, 0.0]);
        assert!(close(east.cosine_similarity(&also_east), 1.0));
        assert!(close(east.cosine_similarity(&west), -1.0));
    }

    #[test]
    fn test_cosine_similarity_unnormalized_input() {
        let emb1 = Embedding::from_normalized(vec![10.0, 0.0]);
        let emb2 = Embedding::from_normalized(vec![3.0, 0.0]);
        assert!(close(emb1.cosine_similarity(&emb2), 1.0));
    }

    #[test]
    fn test_default_batch_preserves_order() {
        let embedder = LengthEmbedder {
            info: ModelInfo {
                name: "length".to_string(),
                dimension: 2,
                max_sequence_length: 16,
            },
        };
        let batch = embedder
            .embed_texts(&["a".to_string(), "abcd".to_string()])
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("abcd").unwrap());
    }

    #[test]
    fn test_embedding_serializes_as_plain_array() {
        let emb = Embedding::from_normalized(vec![0.5, 0.25]);
        let json = serde_json::to_string(&emb).unwrap();
        assert_eq!(json, "[0.5,0.25]");
        let decoded: Embedding = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, emb);
    }
}
