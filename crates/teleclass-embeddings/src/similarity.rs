//! Vector similarity functions.

use crate::model::Embedding;

/// Calculate cosine similarity between two vectors.
///
/// Returns value in [-1.0, 1.0] where 1.0 = identical direction.
/// Vectors of different dimension, or with zero norm, score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Row-wise mean of an embedding matrix, re-normalized.
///
/// Returns `None` for an empty matrix or rows of inconsistent dimension.
pub fn mean_embedding(rows: &[Embedding]) -> Option<Embedding> {
    let first = rows.first()?;
    let dim = first.dimension();
    if rows.iter().any(|r| r.dimension() != dim) {
        return None;
    }

    let n = rows.len() as f32;
    let mut mean = vec![0.0f32; dim];
    for row in rows {
        for (acc, val) in mean.iter_mut().zip(row.values.iter()) {
            *acc += val;
        }
    }
    for val in mean.iter_mut() {
        *val /= n;
    }

    Some(Embedding::new(mean))
}

/// Highest cosine similarity between `query` and any row of `rows`.
///
/// Returns `None` when `rows` is empty.
pub fn max_similarity(query: &Embedding, rows: &[Embedding]) -> Option<f32> {
    rows.iter()
        .map(|row| query.cosine_similarity(row))
        .fold(None, |best, sim| match best {
            Some(b) if b >= sim => Some(b),
            _ => Some(sim),
        })
}
