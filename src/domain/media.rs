//! Media reference types.
//!
//! A submission carries heterogeneous media references. Before classification
//! they are all [`MediaRef`]s; afterwards exactly one may become the
//! [`PrimaryMedia`] and the rest become [`SupportingMediaItem`]s.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a gallery caption, in characters
pub const GALLERY_CAPTION_MAX_CHARS: usize = 80;

/// Stable identity of a media item, independent of its position in any list.
///
/// Derived from the lower-cased URL so that the same reference always maps to
/// the same id, even across resubmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaItemId(Uuid);

impl MediaItemId {
    /// Identity for a URL that has not been classified yet
    pub fn for_url(url: &str) -> Self {
        let key = url.trim().to_lowercase();
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}

impl std::fmt::Display for MediaItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a media reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    /// Embeddable video (YouTube, Vimeo, ...)
    #[serde(alias = "youtube", alias = "video", alias = "embed")]
    VideoEmbed,

    /// Directly viewable image
    Image,

    /// Downloadable document (PDF, office files)
    #[serde(alias = "pdf")]
    Document,

    /// Generic web link
    Link,

    /// Anything we could not make sense of
    #[serde(other)]
    Unknown,
}

impl MediaKind {
    /// Selection priority for the primary slot. Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            MediaKind::VideoEmbed => 3,
            MediaKind::Image => 2,
            MediaKind::Document => 1,
            MediaKind::Link | MediaKind::Unknown => 0,
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, MediaKind::Image)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::VideoEmbed => write!(f, "video-embed"),
            MediaKind::Image => write!(f, "image"),
            MediaKind::Document => write!(f, "document"),
            MediaKind::Link => write!(f, "link"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which schema field a reference was read from.
///
/// Only the ingestion adapter sets this; it never appears in output documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaOrigin {
    /// `primaryMedia`, or a URL freshly submitted as a primary candidate
    NewPrimary,

    /// `supportingMedia`, or an uploaded supporting item
    NewSupporting,

    /// First-generation single `media` object
    LegacyMedia,

    /// Flat `images` / `imageUrls` list
    LegacyImageList,
}

impl Default for MediaOrigin {
    fn default() -> Self {
        Self::NewSupporting
    }
}

/// Where a piece of preview metadata came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataSource {
    /// Fetched from the enrichment provider
    Provider,

    /// Supplied by the caller in a submission
    Caller,

    /// Built locally from the URL alone
    Synthesized,
}

impl MetadataSource {
    /// Stored metadata predating the `source` field was always provider-fetched
    fn stored_default() -> Self {
        Self::Provider
    }
}

/// Link preview metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMetadata {
    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,

    #[serde(default = "MetadataSource::stored_default")]
    pub source: MetadataSource,
}

impl PreviewMetadata {
    /// Minimal metadata carrying only the URL
    pub fn minimal(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
            image_url: None,
            site_name: None,
            source: MetadataSource::Synthesized,
        }
    }

    /// True if any descriptive field is set
    pub fn has_details(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.image_url.is_some()
            || self.site_name.is_some()
    }

    /// Metadata fetched from outside that an edit must not overwrite
    pub fn is_externally_sourced(&self) -> bool {
        self.source == MetadataSource::Provider && self.has_details()
    }

    /// Compare descriptive fields only, ignoring `url` and `source`
    pub fn same_details(&self, other: &PreviewMetadata) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.image_url == other.image_url
            && self.site_name == other.site_name
    }
}

/// A single media reference before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub kind: MediaKind,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_metadata: Option<PreviewMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// Identity carried over from a stored item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MediaItemId>,

    #[serde(default)]
    pub origin: MediaOrigin,
}

impl MediaRef {
    /// Create a bare reference
    pub fn new(kind: MediaKind, url: impl Into<String>, origin: MediaOrigin) -> Self {
        Self {
            kind,
            url: url.into(),
            thumbnail: None,
            preview_metadata: None,
            aspect_ratio: None,
            id: None,
            origin,
        }
    }

    pub fn with_metadata(mut self, metadata: PreviewMetadata) -> Self {
        self.preview_metadata = Some(metadata);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Stored identity, or the URL-derived one
    pub fn item_id(&self) -> MediaItemId {
        self.id.unwrap_or_else(|| MediaItemId::for_url(&self.url))
    }

    /// Preview metadata, synthesizing a minimal one when absent
    pub fn metadata_or_minimal(&self) -> PreviewMetadata {
        self.preview_metadata
            .clone()
            .unwrap_or_else(|| PreviewMetadata::minimal(&self.url))
    }
}

/// The single representative media item of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryMedia {
    pub id: MediaItemId,

    pub kind: MediaKind,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    pub preview_metadata: PreviewMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    #[serde(default = "default_true")]
    pub show_in_gallery: bool,
}

fn default_true() -> bool {
    true
}

impl PrimaryMedia {
    /// Back to an unclassified reference
    pub fn to_ref(&self, origin: MediaOrigin) -> MediaRef {
        MediaRef {
            kind: self.kind,
            url: self.url.clone(),
            thumbnail: self.thumbnail.clone(),
            preview_metadata: Some(self.preview_metadata.clone()),
            aspect_ratio: self.aspect_ratio.clone(),
            id: Some(self.id),
            origin,
        }
    }
}

/// A non-primary media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingMediaItem {
    pub id: MediaItemId,

    pub kind: MediaKind,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    pub preview_metadata: PreviewMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    #[serde(default)]
    pub show_in_gallery: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_caption: Option<String>,
}

impl SupportingMediaItem {
    /// Apply a display flag addressed to this item
    pub fn apply_flag(&mut self, flag: &MasonryFlag) {
        self.show_in_gallery = flag.show_in_gallery;
        self.gallery_caption = clean_caption(flag.gallery_caption.as_deref());
    }

    pub fn to_ref(&self, origin: MediaOrigin) -> MediaRef {
        MediaRef {
            kind: self.kind,
            url: self.url.clone(),
            thumbnail: self.thumbnail.clone(),
            preview_metadata: Some(self.preview_metadata.clone()),
            aspect_ratio: self.aspect_ratio.clone(),
            id: Some(self.id),
            origin,
        }
    }
}

/// First-generation single media object, stored under `media`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMedia {
    #[serde(rename = "type")]
    pub kind: MediaKind,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_metadata: Option<PreviewMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// Per-item gallery display flag, keyed by stable identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasonryFlag {
    pub item_id: MediaItemId,

    #[serde(default)]
    pub show_in_gallery: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_caption: Option<String>,
}

impl MasonryFlag {
    pub fn new(item_id: MediaItemId, show_in_gallery: bool) -> Self {
        Self {
            item_id,
            show_in_gallery,
            gallery_caption: None,
        }
    }

    /// Flag addressed to a URL that may not have been classified yet
    pub fn for_url(url: &str, show_in_gallery: bool) -> Self {
        Self::new(MediaItemId::for_url(url), show_in_gallery)
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.gallery_caption = Some(caption.into());
        self
    }
}

/// Trim a caption and cap it at [`GALLERY_CAPTION_MAX_CHARS`]; blank becomes `None`
pub fn clean_caption(caption: Option<&str>) -> Option<String> {
    let trimmed = caption?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(GALLERY_CAPTION_MAX_CHARS).collect::<String>().trim_end().to_string())
}
