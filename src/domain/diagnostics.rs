//! Diagnostic records returned alongside successful normalizations.
//!
//! Non-fatal conditions are never raised as errors. They are collected as
//! [`Diagnostic`]s so the caller can decide where and how loudly to log them.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single non-fatal event observed during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What happened
    pub code: DiagnosticCode,

    /// Human-readable detail (URLs, ids; NO content bodies)
    pub detail: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(code: DiagnosticCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Kinds of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// Enrichment failed or timed out; minimal metadata was used
    EnrichmentDegraded,

    /// A duplicate image reference was dropped
    DuplicateImageRemoved,

    /// An edit tried to overwrite provider metadata and was ignored
    MetadataPreservedOverride,

    /// Edit produced an empty tag set; the sentinel tag was substituted
    TagFallbackApplied,

    /// A flat-list image moved into supporting media
    ImageRelocated,

    /// A first-generation `media` object was lifted into `primaryMedia`
    LegacyMediaMigrated,
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticCode::EnrichmentDegraded => "enrichment-degraded",
            DiagnosticCode::DuplicateImageRemoved => "duplicate-image-removed",
            DiagnosticCode::MetadataPreservedOverride => "metadata-preserved-override",
            DiagnosticCode::TagFallbackApplied => "tag-fallback-applied",
            DiagnosticCode::ImageRelocated => "image-relocated",
            DiagnosticCode::LegacyMediaMigrated => "legacy-media-migrated",
        };
        f.write_str(name)
    }
}

/// Ordered collection of diagnostics for one normalization call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        debug!(code = %diagnostic.code, detail = %diagnostic.detail, "diagnostic");
        self.0.push(diagnostic);
    }

    pub fn record(&mut self, code: DiagnosticCode, detail: impl Into<String>) {
        self.push(Diagnostic::new(code, detail));
    }

    /// Number of diagnostics with the given code
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.0.iter().filter(|d| d.code == code).count()
    }

    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.count(code) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

/// A successful normalization result with its diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Normalized<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
