//! Local store for sentence-transformer weights.
//!
//! Each HuggingFace repository gets its own flat directory. Only files that
//! are not already present are fetched, so an interrupted download resumes
//! where it stopped.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Sentence transformer used when none is configured
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Everything a BERT-family encoder needs to load.
pub const MODEL_FILES: &[&str] = &[CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];

/// On-disk location of one repository's model files.
#[derive(Debug, Clone)]
pub struct ModelCache {
    root: PathBuf,
    repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::for_repo(DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
        }
    }

    /// `repo_id` stored under the platform cache directory.
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("teleclass")
            .join("models");
        Self::new(root, repo_id)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Last path segment of the repository id.
    pub fn model_name(&self) -> &str {
        self.repo_id.rsplit('/').next().unwrap_or(&self.repo_id)
    }

    /// `org/model` is stored as `<root>/org_model`.
    pub fn model_dir(&self) -> PathBuf {
        self.root.join(self.repo_id.replace('/', "_"))
    }

    /// Model files not yet on disk.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let dir = self.model_dir();
        MODEL_FILES
            .iter()
            .copied()
            .filter(|name| !dir.join(name).exists())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_files().is_empty()
    }

    /// Paths of every model file, downloading whatever is missing.
    pub fn resolve(&self) -> Result<ModelFiles, EmbeddingError> {
        let missing = self.missing_files();
        if missing.is_empty() {
            debug!(dir = ?self.model_dir(), "Model files present");
        } else {
            info!(repo = %self.repo_id, missing = missing.len(), "Fetching model files");
            self.fetch(&missing)?;
        }
        Ok(ModelFiles::in_dir(&self.model_dir()))
    }

    fn fetch(&self, files: &[&str]) -> Result<(), EmbeddingError> {
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let repo = api.model(self.repo_id.clone());

        let dir = self.model_dir();
        std::fs::create_dir_all(&dir)?;
        for &name in files {
            let fetched = repo
                .get(name)
                .map_err(|e| EmbeddingError::Download(format!("{name}: {e}")))?;
            let dest = dir.join(name);
            std::fs::copy(&fetched, &dest)?;
            debug!(file = name, dest = ?dest, "Fetched model file");
        }
        Ok(())
    }
}

/// Resolved model file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_repo_under_platform_cache() {
        let cache = ModelCache::default();
        assert!(cache.root().ends_with("teleclass/models"));
        assert_eq!(cache.repo_id(), DEFAULT_MODEL_REPO);
        assert_eq!(cache.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_missing_files_tracks_disk() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/model");
        assert_eq!(cache.model_dir(), temp.path().join("org_model"));
        assert_eq!(cache.missing_files(), MODEL_FILES.to_vec());

        std::fs::create_dir_all(cache.model_dir()).unwrap();
        std::fs::write(cache.model_dir().join(CONFIG_FILE), "{}").unwrap();
        assert_eq!(cache.missing_files(), vec![TOKENIZER_FILE, WEIGHTS_FILE]);
        assert!(!cache.is_complete());
    }

    #[test]
    fn test_resolve_without_download_when_complete() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/model");
        std::fs::create_dir_all(cache.model_dir()).unwrap();
        for name in MODEL_FILES {
            std::fs::write(cache.model_dir().join(name), "x").unwrap();
        }

        let files = cache.resolve().unwrap();
        assert_eq!(files.weights, temp.path().join("org_model").join(WEIGHTS_FILE));
        assert_eq!(files.tokenizer, temp.path().join("org_model").join(TOKENIZER_FILE));
    }
}
