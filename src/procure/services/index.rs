// SPDX-License-Identifier: MIT

//! Proposal chunk index
//!
//! Stores proposal text chunks with their supplier metadata and answers the
//! two lookups the analysis steps need: which suppliers exist, and which
//! chunks belong to one of them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adk::error::ProcureError;

/// Supplier details found in a proposal document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierMetadata {
    pub supplier: String,
    pub contact_person: String,
    pub email: String,
}

impl SupplierMetadata {
    pub const UNKNOWN: &'static str = "Unknown";
}

impl Default for SupplierMetadata {
    fn default() -> Self {
        Self {
            supplier: Self::UNKNOWN.to_string(),
            contact_person: Self::UNKNOWN.to_string(),
            email: Self::UNKNOWN.to_string(),
        }
    }
}

/// One indexed piece of a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalChunk {
    /// `<file name>_chunk_<n>`
    pub id: String,
    pub text: String,
    pub metadata: SupplierMetadata,
}

#[async_trait]
pub trait ProposalIndex: Send + Sync {
    /// Insert chunks, replacing any with the same id. Returns how many
    /// chunks were stored.
    async fn add(&self, chunks: Vec<ProposalChunk>) -> Result<usize, ProcureError>;

    /// Unique supplier names, sorted
    async fn suppliers(&self) -> Result<Vec<String>, ProcureError>;

    /// Chunk texts for one supplier in insertion order
    async fn documents_for(&self, supplier: &str) -> Result<Vec<String>, ProcureError>;
}

/// In-process index, optionally mirrored to a JSON file so that a later
/// run can skip ingestion and still see the suppliers
#[derive(Clone)]
pub struct LocalProposalIndex {
    chunks: Arc<RwLock<Vec<ProposalChunk>>>,
    path: Option<PathBuf>,
}

impl LocalProposalIndex {
    /// An index that lives only for this process
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(RwLock::new(Vec::new())),
            path: None,
        }
    }

    /// Open an index persisted at `path`, loading existing chunks if the
    /// file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProcureError> {
        let path = path.as_ref().to_path_buf();
        let chunks = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ProcureError::data_format(format!(
                    "proposal index {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "Opened proposal index {} ({} chunks)",
            path.display(),
            chunks.len()
        );

        Ok(Self {
            chunks: Arc::new(RwLock::new(chunks)),
            path: Some(path),
        })
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    async fn persist(&self, chunks: &[ProposalChunk]) -> Result<(), ProcureError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(chunks)?).await?;
        Ok(())
    }
}

impl Default for LocalProposalIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProposalIndex for LocalProposalIndex {
    async fn add(&self, new_chunks: Vec<ProposalChunk>) -> Result<usize, ProcureError> {
        let stored = new_chunks.len();
        let mut chunks = self.chunks.write().await;
        for chunk in new_chunks {
            match chunks.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk,
                None => chunks.push(chunk),
            }
        }
        self.persist(&chunks).await?;
        log::info!("Stored {} chunks ({} total)", stored, chunks.len());
        Ok(stored)
    }

    async fn suppliers(&self) -> Result<Vec<String>, ProcureError> {
        let chunks = self.chunks.read().await;
        let unique: BTreeSet<&str> = chunks.iter().map(|c| c.metadata.supplier.as_str()).collect();
        Ok(unique.into_iter().map(String::from).collect())
    }

    async fn documents_for(&self, supplier: &str) -> Result<Vec<String>, ProcureError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .iter()
            .filter(|c| c.metadata.supplier == supplier)
            .map(|c| c.text.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chunk(id: &str, supplier: &str, text: &str) -> ProposalChunk {
        ProposalChunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: SupplierMetadata {
                supplier: supplier.to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_suppliers_are_unique_and_sorted() {
        let index = LocalProposalIndex::new();
        index
            .add(vec![
                chunk("b.pdf_chunk_0", "Globex", "g0"),
                chunk("a.pdf_chunk_0", "Acme", "a0"),
                chunk("a.pdf_chunk_1", "Acme", "a1"),
            ])
            .await
            .unwrap();

        assert_eq!(index.suppliers().await.unwrap(), vec!["Acme", "Globex"]);
        assert_eq!(index.documents_for("Acme").await.unwrap(), vec!["a0", "a1"]);
        assert!(index.documents_for("Initech").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_upserts_by_id() {
        let index = LocalProposalIndex::new();
        index.add(vec![chunk("a.pdf_chunk_0", "Acme", "old")]).await.unwrap();
        index.add(vec![chunk("a.pdf_chunk_0", "Acme", "new")]).await.unwrap();

        assert_eq!(index.len().await, 1);
        assert_eq!(index.documents_for("Acme").await.unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_persisted_index_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index").join("proposals.json");

        let index = LocalProposalIndex::open(&path).await.unwrap();
        assert!(index.is_empty().await);
        index.add(vec![chunk("a.pdf_chunk_0", "Acme", "a0")]).await.unwrap();

        let reopened = LocalProposalIndex::open(&path).await.unwrap();
        assert_eq!(reopened.suppliers().await.unwrap(), vec!["Acme"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_data_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proposals.json");
        std::fs::write(&path, "not json").unwrap();

        let err = LocalProposalIndex::open(&path).await.err().unwrap();
        assert!(matches!(err, ProcureError::DataFormat(_)));
    }
}
