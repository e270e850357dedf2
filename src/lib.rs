//! cardnorm - Content normalization and media classification
//!
//! Turns raw user submissions (pasted URLs, uploaded media references, free
//! text, per-item display flags) into one canonical content record, plus a
//! primary/supporting media split and a card layout type.
//!
//! # Modes
//!
//! - create: build a complete record; empty tags are rejected
//! - edit: merge into a stored record and return only what changed; nothing
//!   stored is dropped unless the caller explicitly deleted it
//!
//! Both schema generations are read (legacy `media` + flat `images`, and
//! `primaryMedia` + `supportingMedia`); only the newer one is written.
//!
//! # Modules
//!
//! - `adapters`: Link-preview enrichment (HTTP, disabled)
//! - `core`: Tags, dedup, media and card classification, the normalizer
//! - `domain`: Data structures (submissions, media, records, diagnostics)
//! - `library`: Document stores (JSON files, in-memory)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Normalize and store a submission
//! cardnorm create --input submission.json
//!
//! # Preview an edit without applying it
//! cat edit.json | cardnorm edit <content-id> --dry-run
//!
//! # See how a URL is classified
//! cardnorm inspect-url https://youtu.be/dQw4w9WgXcQ
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{DisabledPreviewFetcher, EnrichmentError, HttpPreviewFetcher, PreviewFetcher};
pub use core::{ContentNormalizer, NormalizeError, NormalizerSettings};
pub use domain::{
    CardType, ContentId, Diagnostic, DiagnosticCode, Normalized, NormalizedContent,
    PersistedDocument, RawSubmission, UpdatePayload,
};
pub use library::{ContentStore, FileContentStore, MemoryContentStore};
