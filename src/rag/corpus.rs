//! Indexed corpus: vector index and corpus store kept in lock-step, plus
//! their on-disk form.
//!
//! A persisted corpus is a directory holding `vectors.bin`, `chunks.json` and
//! `manifest.json`. The manifest records counts, dimension and SHA-256 of both
//! data files so a mismatched pair is rejected at load time.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::index::FlatIndex;
use super::store::CorpusStore;
use crate::core::errors::RagError;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub embedder_model: String,
    pub dimension: usize,
    pub count: usize,
    pub vectors_sha256: String,
    pub chunks_sha256: String,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    index: FlatIndex,
    store: CorpusStore,
    embedder_model: String,
}

impl Corpus {
    /// Pairs an index with its store; both must describe the same positions.
    pub fn new(
        index: FlatIndex,
        store: CorpusStore,
        embedder_model: impl Into<String>,
    ) -> Result<Self, RagError> {
        if index.len() != store.len() {
            return Err(RagError::InvalidInput(format!(
                "index holds {} vectors but store holds {} chunks",
                index.len(),
                store.len()
            )));
        }
        Ok(Self {
            index,
            store,
            embedder_model: embedder_model.into(),
        })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    pub fn embedder_model(&self) -> &str {
        &self.embedder_model
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Writes all three artifacts into a staging directory next to `dir`,
    /// then swaps it into place.
    pub fn save(&self, dir: &Path) -> Result<IndexManifest, RagError> {
        let staging = sibling_path(dir, "staging")?;
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let vectors = self.index.to_bytes();
        let chunks = self.store.to_json()?;
        let manifest = IndexManifest {
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            embedder_model: self.embedder_model.clone(),
            dimension: self.index.dimension(),
            count: self.index.len(),
            vectors_sha256: sha256_hex(&vectors),
            chunks_sha256: sha256_hex(&chunks),
        };

        fs::write(staging.join(VECTORS_FILE), &vectors)?;
        fs::write(staging.join(CHUNKS_FILE), &chunks)?;
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        if dir.exists() {
            let previous = sibling_path(dir, "previous")?;
            if previous.exists() {
                fs::remove_dir_all(&previous)?;
            }
            fs::rename(dir, &previous)?;
            fs::rename(&staging, dir)?;
            fs::remove_dir_all(&previous)?;
        } else {
            if let Some(parent) = dir.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&staging, dir)?;
        }

        tracing::info!(
            "Saved corpus index ({} chunks, dimension {}) to {}",
            manifest.count,
            manifest.dimension,
            dir.display()
        );
        Ok(manifest)
    }

    /// Loads and cross-checks a persisted corpus.
    ///
    /// Every failure, including a manifest mismatch, is `IndexUnavailable`.
    pub fn load(dir: &Path) -> Result<(Self, IndexManifest), RagError> {
        let manifest_bytes = read_artifact(dir, MANIFEST_FILE)?;
        let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| RagError::index(format!("manifest is unreadable: {}", e)))?;

        let vectors = read_artifact(dir, VECTORS_FILE)?;
        let chunks = read_artifact(dir, CHUNKS_FILE)?;

        if sha256_hex(&vectors) != manifest.vectors_sha256 {
            return Err(RagError::index("vectors.bin does not match its manifest checksum"));
        }
        if sha256_hex(&chunks) != manifest.chunks_sha256 {
            return Err(RagError::index("chunks.json does not match its manifest checksum"));
        }

        let index = FlatIndex::from_bytes(&vectors)?;
        let store = CorpusStore::from_json(&chunks)?;

        if index.len() != manifest.count || store.len() != manifest.count {
            return Err(RagError::index(format!(
                "manifest promises {} entries, index has {}, store has {}",
                manifest.count,
                index.len(),
                store.len()
            )));
        }
        if index.dimension() != manifest.dimension {
            return Err(RagError::index(format!(
                "manifest dimension {} differs from index dimension {}",
                manifest.dimension,
                index.dimension()
            )));
        }

        let corpus = Self {
            index,
            store,
            embedder_model: manifest.embedder_model.clone(),
        };
        Ok((corpus, manifest))
    }
}

fn read_artifact(dir: &Path, name: &str) -> Result<Vec<u8>, RagError> {
    let path = dir.join(name);
    fs::read(&path).map_err(|e| RagError::index(format!("{}: {}", path.display(), e)))
}

fn sibling_path(dir: &Path, suffix: &str) -> Result<PathBuf, RagError> {
    let name = dir
        .file_name()
        .ok_or_else(|| RagError::InvalidInput(format!("{} is not a directory name", dir.display())))?;
    Ok(dir.with_file_name(format!("{}.{}", name.to_string_lossy(), suffix)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::chunker::Chunk;

    fn chunk(text: &str, sequence_index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            document_id: "handbook.txt".to_string(),
            sequence_index,
            start_offset: sequence_index * 10,
        }
    }

    fn sample_corpus() -> Corpus {
        let index = FlatIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let store = CorpusStore::new(vec![chunk("first", 0), chunk("second", 1)]);
        Corpus::new(index, store, "hashing-2").unwrap()
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let index = FlatIndex::build(&[vec![1.0, 0.0]]).unwrap();
        let store = CorpusStore::new(vec![chunk("a", 0), chunk("b", 1)]);
        assert!(Corpus::new(index, store, "m").is_err());
    }

    #[test]
    fn saved_corpus_loads_with_same_positions() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index");
        let written = sample_corpus().save(&target).unwrap();

        let (loaded, manifest) = Corpus::load(&target).unwrap();
        assert_eq!(manifest, written);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.store().get(1).unwrap().text, "second");
        assert_eq!(loaded.index().vector(1), Some(vec![0.0, 1.0]));
        assert_eq!(loaded.embedder_model(), "hashing-2");
    }

    #[test]
    fn save_replaces_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index");
        sample_corpus().save(&target).unwrap();

        let index = FlatIndex::build(&[vec![0.5, 0.5]]).unwrap();
        let store = CorpusStore::new(vec![chunk("only", 0)]);
        Corpus::new(index, store, "hashing-2").unwrap().save(&target).unwrap();

        let (loaded, _) = Corpus::load(&target).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!dir.path().join("index.previous").exists());
        assert!(!dir.path().join("index.staging").exists());
    }

    #[test]
    fn missing_directory_is_index_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Corpus::load(&dir.path().join("absent")),
            Err(RagError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn chunks_swapped_after_build_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index");
        sample_corpus().save(&target).unwrap();

        let drifted = CorpusStore::new(vec![chunk("first", 0)]);
        fs::write(target.join(CHUNKS_FILE), drifted.to_json().unwrap()).unwrap();

        let err = Corpus::load(&target).unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable(ref msg) if msg.contains("chunks.json")));
    }
}
