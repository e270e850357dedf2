//! Core normalization logic.
//!
//! This module contains:
//! - Tags: canonical tag sets
//! - Dedup: image URL deduplication (create and edit policies)
//! - Classifier: primary/supporting media, thumbnails, image collection
//! - CardType: hybrid vs media-only decision table
//! - Normalizer: create and edit orchestration

pub mod card_type;
pub mod classifier;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod tags;
pub mod text;
pub mod urls;

// Re-export commonly used types
pub use card_type::{classify_card, CardSignals, CAPTION_MAX_CHARS, CAPTION_MAX_LINES};
pub use classifier::{
    classify, collect_all_image_urls, resolve_thumbnail, select_primary, FlagIndex,
    MediaClassification,
};
pub use dedup::{dedupe_for_create, dedupe_for_edit, url_key, DedupOutcome, RemovedDuplicate};
pub use error::{NormalizeError, StaleReadError, ValidationError};
pub use ingest::{refs_from_submission, ExistingMedia};
pub use normalizer::{ContentNormalizer, NormalizerSettings};
pub use tags::{normalize_tags, normalize_tags_or_fallback, FALLBACK_TAG};
pub use text::{excerpt, read_time_minutes, EXCERPT_MAX_CHARS};
pub use urls::{classify_url, derived_video_thumbnail, video_id, VideoId, VideoProvider};
