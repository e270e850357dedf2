//! Document persistence contract and an in-memory implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{ContentId, NormalizedContent, PersistedDocument, UpdatePayload};

/// Read/write contract for stored content documents.
///
/// The normalizer only reads through this trait. Writes belong to the
/// caller, which decides whether a normalized result is persisted.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Load a document. `Ok(None)` when no document has that id.
    async fn load_existing_content(&self, id: &ContentId) -> Result<Option<PersistedDocument>>;

    /// Store newly created content under a fresh id
    async fn insert(&self, content: NormalizedContent) -> Result<PersistedDocument>;

    /// Apply an edit payload to a stored document
    async fn apply_update(&self, id: &ContentId, payload: &UpdatePayload) -> Result<PersistedDocument>;
}

/// Process-local store, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    documents: RwLock<HashMap<ContentId, PersistedDocument>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document as-is (including legacy fields)
    pub async fn put(&self, document: PersistedDocument) {
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn load_existing_content(&self, id: &ContentId) -> Result<Option<PersistedDocument>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn insert(&self, content: NormalizedContent) -> Result<PersistedDocument> {
        let document = PersistedDocument::from_normalized(ContentId::generate(), content, Utc::now());
        self.put(document.clone()).await;
        Ok(document)
    }

    async fn apply_update(&self, id: &ContentId, payload: &UpdatePayload) -> Result<PersistedDocument> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(id)
            .with_context(|| format!("Content not found: {}", id))?;
        document.apply(payload, Utc::now());
        Ok(document.clone())
    }
}
