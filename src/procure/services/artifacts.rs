// SPDX-License-Identifier: MIT

//! Markdown artifact persistence

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::adk::error::ProcureError;

/// Stores the markdown documents steps produce
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `content` under `filename`, creating the output directory if
    /// needed. Returns the written path.
    async fn save(&self, content: &str, filename: &str) -> Result<PathBuf, ProcureError>;

    /// Read an artifact back; `None` when it was never written
    async fn load(&self, filename: &str) -> Result<Option<String>, ProcureError>;
}

/// Artifact store backed by a directory of markdown files
pub struct MarkdownStore {
    output_dir: PathBuf,
}

impl MarkdownStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

#[async_trait]
impl ArtifactStore for MarkdownStore {
    async fn save(&self, content: &str, filename: &str) -> Result<PathBuf, ProcureError> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(filename);
        fs::write(&path, content).await?;
        log::info!("Output saved to {}", path.display());
        Ok(path)
    }

    async fn load(&self, filename: &str) -> Result<Option<String>, ProcureError> {
        let path = self.output_dir.join(filename);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
