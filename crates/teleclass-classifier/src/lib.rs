//! # teleclass-classifier
//!
//! Hierarchical similarity classification over a taxonomy.
//!
//! Each class gets one prototype embedding. Prediction walks the taxonomy
//! top-down, keeping the single most similar class at every level, and
//! returns the whole root-to-node path.

mod error;
mod metrics;
mod similarity;

pub use error::ClassifierError;
pub use metrics::{evaluate_predictions, Metrics};
pub use similarity::{PrototypeSource, SimilarityClassifier};
