// SPDX-License-Identifier: MIT

//! Proposal document ingestion
//!
//! Reads every proposal in a directory, pulls supplier metadata from the
//! text, splits it into overlapping chunks and stores them in a
//! `ProposalIndex`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::index::{ProposalChunk, ProposalIndex, SupplierMetadata};
use crate::adk::error::ProcureError;

static COMPANY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Company Name:[ \t]*([^\r\n]+)").unwrap());
static CONTACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Contact(?: Person)?:[ \t]*([\w \t.'-]+)").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Success,
    Failure,
}

/// Outcome of one ingestion pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    /// Number of proposal files that produced at least one chunk
    pub processed_files: usize,
    pub chunks: usize,
    /// File names that were indexed
    pub files: Vec<String>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.status == IngestStatus::Success
    }

    pub fn failure() -> Self {
        Self {
            status: IngestStatus::Failure,
            processed_files: 0,
            chunks: 0,
            files: Vec::new(),
        }
    }
}

#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    async fn ingest(&self, dir: &Path) -> Result<IngestReport, ProcureError>;
}

/// Turns a document file into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ProcureError>;
}

/// Reads the file bytes as UTF-8, replacing invalid sequences.
///
/// Suitable for text-layer exports; binary PDFs need a real extractor.
pub struct Utf8Extractor;

#[async_trait]
impl TextExtractor for Utf8Extractor {
    async fn extract(&self, path: &Path) -> Result<String, ProcureError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fixed-width character windows with overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Pull supplier name, contact and e-mail out of proposal text
pub fn extract_metadata(text: &str) -> SupplierMetadata {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let mut metadata = SupplierMetadata::default();
    if let Some(supplier) = capture(&COMPANY_NAME) {
        metadata.supplier = supplier;
    }
    if let Some(contact) = capture(&CONTACT) {
        metadata.contact_person = contact;
    }
    if let Some(email) = EMAIL.find(text) {
        metadata.email = email.as_str().to_string();
    }
    metadata
}

/// Ingests every `*.pdf` file in a directory into a proposal index
pub struct DirectoryIngestor {
    index: Arc<dyn ProposalIndex>,
    extractor: Arc<dyn TextExtractor>,
    splitter: TextSplitter,
}

impl DirectoryIngestor {
    pub fn new(index: Arc<dyn ProposalIndex>, splitter: TextSplitter) -> Self {
        Self {
            index,
            extractor: Arc::new(Utf8Extractor),
            splitter,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    async fn proposal_files(dir: &Path) -> Result<Vec<PathBuf>, ProcureError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if is_pdf && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DocumentIngestor for DirectoryIngestor {
    async fn ingest(&self, dir: &Path) -> Result<IngestReport, ProcureError> {
        if !dir.is_dir() {
            return Err(ProcureError::config(format!(
                "proposal directory {} does not exist",
                dir.display()
            )));
        }

        let mut chunks = Vec::new();
        let mut files = Vec::new();

        for path in Self::proposal_files(dir).await? {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let text = match self.extractor.extract(&path).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping {}: {}", filename, e);
                    continue;
                }
            };

            let metadata = extract_metadata(&text);
            let pieces = self.splitter.split(&text);
            if pieces.is_empty() {
                log::warn!("{} has no extractable text", filename);
                continue;
            }

            for (i, piece) in pieces.into_iter().enumerate() {
                let id = format!("{}_chunk_{}", filename, i);
                log::debug!("Processed {} | Supplier: {}", id, metadata.supplier);
                chunks.push(ProposalChunk {
                    id,
                    text: piece,
                    metadata: metadata.clone(),
                });
            }
            log::info!("Processed {} | Supplier: {}", filename, metadata.supplier);
            files.push(filename);
        }

        if chunks.is_empty() {
            log::warn!("No valid chunks to store from {}", dir.display());
            return Ok(IngestReport::failure());
        }

        let stored = self.index.add(chunks).await?;
        Ok(IngestReport {
            status: IngestStatus::Success,
            processed_files: files.len(),
            chunks: stored,
            files,
        })
    }
}
