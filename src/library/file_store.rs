//! JSON-file document store.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.cardnorm/
//! └── content/
//!     └── <content_id>.json     # One PersistedDocument per file
//! ```
//!
//! Writes go to a temp file in the same directory and are renamed into
//! place, so a reader never sees a half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::debug;

use crate::domain::{ContentId, NormalizedContent, PersistedDocument, UpdatePayload};

use super::store::ContentStore;

/// Store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store at the configured location
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(crate::config::store_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a document file. Ids that could leave the store root are rejected.
    pub fn document_path(&self, id: &ContentId) -> Result<PathBuf> {
        if !id.is_path_safe() {
            anyhow::bail!("Invalid content id: {:?}", id.as_str());
        }
        Ok(self.root.join(format!("{}.json", id.as_str())))
    }

    /// Read a document without interpreting a missing file as an error
    async fn read(&self, id: &ContentId) -> Result<Option<PersistedDocument>> {
        let path = self.document_path(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        let document = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse document: {}", path.display()))?;

        Ok(Some(document))
    }

    /// Atomically write a document under its own id
    pub async fn write(&self, document: &PersistedDocument) -> Result<PathBuf> {
        let path = self.document_path(&document.id)?;
        self.write_to(path, document).await
    }

    async fn write_to(&self, path: PathBuf, document: &PersistedDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create store dir: {}", self.root.display()))?;

        let json = serde_json::to_vec_pretty(document)?;
        let root = self.root.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)
                .with_context(|| format!("Failed to create temp file in {}", root.display()))?;
            tmp.write_all(&json)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target)
                .with_context(|| format!("Failed to persist document: {}", target.display()))?;
            Ok(())
        })
        .await
        .context("Document write task panicked")??;

        debug!(path = %path.display(), "Wrote document");
        Ok(path)
    }
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn load_existing_content(&self, id: &ContentId) -> Result<Option<PersistedDocument>> {
        self.read(id).await
    }

    async fn insert(&self, content: NormalizedContent) -> Result<PersistedDocument> {
        let document = PersistedDocument::from_normalized(ContentId::generate(), content, Utc::now());
        self.write(&document).await?;
        Ok(document)
    }

    async fn apply_update(&self, id: &ContentId, payload: &UpdatePayload) -> Result<PersistedDocument> {
        let path = self.document_path(id)?;
        let mut document = self
            .read(id)
            .await?
            .with_context(|| format!("Content not found: {}", id))?;

        if payload.is_empty() {
            return Ok(document);
        }

        document.apply(payload, Utc::now());
        self.write_to(path, &document).await?;
        Ok(document)
    }
}
