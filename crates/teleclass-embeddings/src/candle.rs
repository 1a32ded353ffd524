//! Candle-based embedding implementation.
//!
//! Runs a BERT-family sentence transformer on the CPU with mean pooling.
//! The embedding dimension is read from the model config.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::cache::{ModelCache, ModelFiles};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Maximum sequence length
pub const MAX_SEQ_LENGTH: usize = 256;

/// Local sentence-transformer embedder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the repository held by `cache`, fetching missing files first.
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let files = cache.resolve()?;
        Self::from_files(cache.model_name(), &files)
    }

    /// The default sentence transformer from the platform cache.
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    /// Load from already-resolved model files.
    pub fn from_files(name: &str, files: &ModelFiles) -> Result<Self, EmbeddingError> {
        info!(model = name, "Loading embedding model");
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&files.config)?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| EmbeddingError::InvalidConfig(e.to_string()))?;
        let dimension = hidden_size(&raw_config)?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file belongs to the model cache and is not
        // rewritten while mapped.
        let weights = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };
        let model = BertModel::load(weights, &config)?;

        info!(model = name, dimension = dimension, max_seq = MAX_SEQ_LENGTH, "Model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: name.to_string(),
                dimension,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

}

/// Average token vectors, ignoring padding positions.
fn mean_pool(tokens: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = attention_mask
        .unsqueeze(2)?
        .broadcast_as(tokens.shape())?
        .to_dtype(DType::F32)?;
    let summed = tokens.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&counts)?)
}

/// Token ids and attention masks, truncated and zero-padded to one length.
fn pad_encodings(encodings: &[Encoding]) -> (Vec<u32>, Vec<u32>, usize) {
    let width = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0)
        .min(MAX_SEQ_LENGTH);

    let mut ids = Vec::with_capacity(encodings.len() * width);
    let mut mask = Vec::with_capacity(encodings.len() * width);
    for encoding in encodings {
        pad_into(&mut ids, encoding.get_ids(), width);
        pad_into(&mut mask, encoding.get_attention_mask(), width);
    }
    (ids, mask, width)
}

fn pad_into(out: &mut Vec<u32>, src: &[u32], width: usize) {
    let kept = src.len().min(width);
    out.extend_from_slice(&src[..kept]);
    out.resize(out.len() + width - kept, 0);
}

/// Read `hidden_size` (the pooled embedding dimension) from a model config.
fn hidden_size(config_json: &str) -> Result<usize, EmbeddingError> {
    let value: serde_json::Value = serde_json::from_str(config_json)
        .map_err(|e| EmbeddingError::InvalidConfig(e.to_string()))?;
    value
        .get("hidden_size")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| EmbeddingError::InvalidConfig("missing hidden_size".to_string()))
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::MissingVector { index: 0 })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let (ids, mask, width) = pad_encodings(&encodings);
        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(ids, (batch_size, width), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch_size, width), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let tokens = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let rows: Vec<Vec<f32>> = mean_pool(&tokens, &attention_mask)?.to_vec2()?;

        let embeddings: Vec<Embedding> = rows.into_iter().map(Embedding::new).collect();
        if embeddings.len() != batch_size {
            return Err(EmbeddingError::MissingVector {
                index: embeddings.len(),
            });
        }

        Ok(embeddings)
    }
}
