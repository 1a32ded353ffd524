//! File-backed enrichment cache.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use teleclass_types::{CacheSettings, DocumentMeta, EnrichedClasses};

use crate::error::CacheError;

/// Enriched class map artifact
pub const CLASS_TERMS_FILE: &str = "class_terms.json";

/// Tagged document artifact
pub const ASSIGNMENTS_FILE: &str = "assignments.json";

/// Corpus-stage term snapshot, kept for inspection
pub const CORPUS_TERMS_FILE: &str = "corpus_terms.json";

/// On-disk wrapper around a cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    pub taxonomy_fingerprint: String,
    pub saved_at: DateTime<Utc>,
    pub payload: T,
}

/// Reads and writes enrichment artifacts in one directory.
#[derive(Debug, Clone)]
pub struct EnrichmentCache {
    directory: PathBuf,
    fingerprint: String,
    verify_taxonomy: bool,
}

impl EnrichmentCache {
    /// Cache in `directory` for the taxonomy with `fingerprint`.
    pub fn new(directory: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            fingerprint: fingerprint.into(),
            verify_taxonomy: true,
        }
    }

    pub fn from_settings(settings: &CacheSettings, fingerprint: impl Into<String>) -> Self {
        Self::new(settings.directory.clone(), fingerprint).with_verification(settings.verify_taxonomy)
    }

    /// When disabled, artifacts are used whatever taxonomy produced them.
    pub fn with_verification(mut self, verify_taxonomy: bool) -> Self {
        self.verify_taxonomy = verify_taxonomy;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn has_class_terms(&self) -> bool {
        self.directory.join(CLASS_TERMS_FILE).exists()
    }

    pub fn has_assignments(&self) -> bool {
        self.directory.join(ASSIGNMENTS_FILE).exists()
    }

    pub fn save_class_terms(&self, classes: &EnrichedClasses) -> Result<(), CacheError> {
        self.save(CLASS_TERMS_FILE, classes)
    }

    /// Cached class map, or `None` when absent or stale.
    pub fn load_class_terms(&self) -> Result<Option<EnrichedClasses>, CacheError> {
        self.load(CLASS_TERMS_FILE)
    }

    pub fn save_assignments(&self, documents: &[DocumentMeta]) -> Result<(), CacheError> {
        self.save(ASSIGNMENTS_FILE, documents)
    }

    /// Cached tagged documents, or `None` when absent or stale.
    pub fn load_assignments(&self) -> Result<Option<Vec<DocumentMeta>>, CacheError> {
        self.load(ASSIGNMENTS_FILE)
    }

    pub fn save_corpus_terms(&self, classes: &EnrichedClasses) -> Result<(), CacheError> {
        self.save(CORPUS_TERMS_FILE, classes)
    }

    pub fn load_corpus_terms(&self) -> Result<Option<EnrichedClasses>, CacheError> {
        self.load(CORPUS_TERMS_FILE)
    }

    /// Remove every artifact. Missing files are not an error.
    pub fn clear(&self) -> Result<(), CacheError> {
        for name in [CLASS_TERMS_FILE, ASSIGNMENTS_FILE, CORPUS_TERMS_FILE] {
            let path = self.directory.join(name);
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = ?path, "Removed cache artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }
        info!(directory = ?self.directory, "Cleared enrichment cache");
        Ok(())
    }

    fn save<T: Serialize + ?Sized>(&self, name: &str, payload: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory).map_err(|source| CacheError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let envelope = CacheEnvelope {
            taxonomy_fingerprint: self.fingerprint.clone(),
            saved_at: Utc::now(),
            payload,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        let path = self.directory.join(name);
        fs::write(&path, json).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = ?path, "Saved cache artifact");
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        let path = self.directory.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "Cache miss");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let envelope: CacheEnvelope<T> = serde_json::from_slice(&bytes)
            .map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;

        if self.verify_taxonomy && envelope.taxonomy_fingerprint != self.fingerprint {
            warn!(
                path = ?path,
                cached = %envelope.taxonomy_fingerprint,
                current = %self.fingerprint,
                "Cached artifact was built for a different taxonomy, ignoring"
            );
            return Ok(None);
        }

        info!(path = ?path, saved_at = %envelope.saved_at, "Loaded cache artifact");
        Ok(Some(envelope.payload))
    }
}
