//! Domain types for the normalization engine.
//!
//! This module contains the core data structures:
//! - Media: references, primary and supporting items, display flags
//! - Submission: raw user input
//! - Content: normalized records, stored documents, edit payloads
//! - Diagnostics: non-fatal events returned with every result

pub mod content;
pub mod diagnostics;
pub mod media;
pub mod submission;

// Re-export commonly used types
pub use content::{
    ArticleMedia, CardType, ContentId, NormalizedContent, Patch, PersistedDocument,
    UpdatePayload, Visibility,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Normalized};
pub use media::{
    LegacyMedia, MasonryFlag, MediaItemId, MediaKind, MediaOrigin, MediaRef, MetadataSource,
    PreviewMetadata, PrimaryMedia, SupportingMediaItem,
};
pub use submission::RawSubmission;
