//! Adapter interfaces for external systems.
//!
//! The only external lookup the normalizer performs is link-preview
//! enrichment. Adapters must never be trusted to return on time; the caller
//! wraps every call in its own timeout.

pub mod preview;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::PreviewMetadata;

// Re-export the HTTP adapter
pub use preview::{HttpPreviewFetcher, PreviewFetcherConfig};

/// Why enrichment produced no metadata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("Enrichment timed out after {0:?}")]
    Timeout(Duration),

    #[error("Enrichment request failed: {0}")]
    Request(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Content is not HTML: {0}")]
    NotHtml(String),

    #[error("No preview metadata found")]
    NoMetadata,

    #[error("Enrichment is disabled")]
    Disabled,
}

/// Link-preview metadata lookup
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Fetch preview metadata for a URL within `timeout`
    async fn fetch_preview_metadata(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<PreviewMetadata, EnrichmentError>;
}

/// Fetcher that never looks anything up
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPreviewFetcher;

#[async_trait]
impl PreviewFetcher for DisabledPreviewFetcher {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn fetch_preview_metadata(
        &self,
        _url: &str,
        _timeout: Duration,
    ) -> Result<PreviewMetadata, EnrichmentError> {
        Err(EnrichmentError::Disabled)
    }
}
