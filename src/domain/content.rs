//! Normalized content records and edit payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::media::{LegacyMedia, PrimaryMedia, SupportingMediaItem};

/// Identifier of a stored content record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier for a new record
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Usable as a single file name: no separators, no `..`, no control
    /// characters, not blank.
    pub fn is_path_safe(&self) -> bool {
        let id = self.0.as_str();
        !id.trim().is_empty()
            && !id.contains("..")
            && !id.chars().any(|c| c == '/' || c == '\\' || c.is_control())
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            anyhow::bail!("Content id must not be empty");
        }
        let id = Self(trimmed.to_string());
        if !id.is_path_safe() {
            anyhow::bail!("Invalid content id: {:?}", trimmed);
        }
        Ok(id)
    }
}

/// Who can see a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

/// Card layout class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardType {
    /// Media block plus a separate, truncatable text block
    Hybrid,

    /// Text is a short caption overlaid on the media
    MediaOnly,
}

impl Default for CardType {
    fn default() -> Self {
        Self::Hybrid
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardType::Hybrid => write!(f, "hybrid"),
            CardType::MediaOnly => write!(f, "media-only"),
        }
    }
}

/// The canonical content record produced by create mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedContent {
    /// User-typed title. Metadata-derived titles are never stored here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub content: String,

    /// Plain-text preview, at most 150 characters
    pub excerpt: String,

    /// Estimated read time in minutes
    pub read_time: u32,

    pub tags: Vec<String>,

    pub visibility: Visibility,

    pub primary_media: Option<PrimaryMedia>,

    pub supporting_media: Vec<SupportingMediaItem>,

    /// Flat image list kept for older readers. Never shares a URL with
    /// `supporting_media`.
    #[serde(alias = "images")]
    pub image_urls: Vec<String>,

    pub card_type: CardType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NormalizedContent {
    /// Title to show: the user's own, else the primary media's metadata title
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or_else(|| {
            self.primary_media
                .as_ref()
                .and_then(|p| p.preview_metadata.title.as_deref())
        })
    }
}

/// A stored content record as read back from persistence.
///
/// Accepts both schema generations: the legacy single `media` object and flat
/// `images` list alongside `primaryMedia` / `supportingMedia`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub id: ContentId,

    #[serde(flatten)]
    pub content: NormalizedContent,

    /// First-generation media field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<LegacyMedia>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PersistedDocument {
    /// Wrap freshly normalized content for storage
    pub fn from_normalized(id: ContentId, mut content: NormalizedContent, now: DateTime<Utc>) -> Self {
        if content.created_at.is_none() {
            content.created_at = Some(now);
        }
        Self {
            id,
            content,
            media: None,
            updated_at: None,
        }
    }

    /// Structural checks a document must pass before it can be merged against
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("document has an empty id".to_string());
        }
        if let Some(primary) = &self.content.primary_media {
            if primary.url.trim().is_empty() {
                return Err("primary media has an empty url".to_string());
            }
        }
        if let Some(index) = self
            .content
            .supporting_media
            .iter()
            .position(|item| item.url.trim().is_empty())
        {
            return Err(format!("supporting media item {} has an empty url", index));
        }
        if let Some(media) = &self.media {
            if media.url.trim().is_empty() {
                return Err("legacy media has an empty url".to_string());
            }
        }
        Ok(())
    }

    /// Apply an edit payload: absent fields are left alone, cleared fields
    /// are reset.
    pub fn apply(&mut self, payload: &UpdatePayload, now: DateTime<Utc>) {
        if payload.is_empty() {
            return;
        }

        let content = &mut self.content;
        payload.title.clone().apply_to(&mut content.title);
        if let Some(body) = &payload.content {
            content.content = body.clone();
        }
        if let Some(excerpt) = &payload.excerpt {
            content.excerpt = excerpt.clone();
        }
        if let Some(read_time) = payload.read_time {
            content.read_time = read_time;
        }
        if let Some(tags) = &payload.tags {
            content.tags = tags.clone();
        }
        if let Some(visibility) = payload.visibility {
            content.visibility = visibility;
        }
        payload.primary_media.clone().apply_to(&mut content.primary_media);
        if let Some(supporting) = &payload.supporting_media {
            content.supporting_media = supporting.clone();
        }
        if let Some(image_urls) = &payload.image_urls {
            content.image_urls = image_urls.clone();
        }
        if let Some(card_type) = payload.card_type {
            content.card_type = card_type;
        }
        if let Some(created_at) = payload.created_at {
            content.created_at = Some(created_at);
        }
        payload.media.clone().apply_to(&mut self.media);

        self.updated_at = Some(now);
    }
}

/// Presence-sensitive field update.
///
/// Serialized as: absent (`Keep`, via `skip_serializing_if`), `null` (`Clear`)
/// or the value (`Set`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value untouched
    Keep,

    /// Explicitly clear the stored value
    Clear,

    /// Replace the stored value
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Patch::Clear)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Apply to an optional stored field
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *target = None,
            Patch::Set(value) => *target = Some(value),
        }
    }
}

impl<T: PartialEq> Patch<T> {
    /// Patch turning `current` into `next`
    pub fn diff(current: Option<&T>, next: Option<T>) -> Self {
        match (current, next) {
            (None, None) => Patch::Keep,
            (Some(_), None) => Patch::Clear,
            (Some(current), Some(next)) if *current == next => Patch::Keep,
            (_, Some(next)) => Patch::Set(next),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Absent fields never reach here; `#[serde(default)]` yields Keep.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

/// Partial update produced by edit mode.
///
/// A field that is absent means "do not touch"; `null` means "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub title: Patch<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub primary_media: Patch<PrimaryMedia>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supporting_media: Option<Vec<SupportingMediaItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,

    /// Legacy single-media field; only ever cleared
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub media: Patch<LegacyMedia>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UpdatePayload {
    /// True if applying this payload changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_keep()
            && self.content.is_none()
            && self.excerpt.is_none()
            && self.read_time.is_none()
            && self.tags.is_none()
            && self.visibility.is_none()
            && self.primary_media.is_keep()
            && self.supporting_media.is_none()
            && self.image_urls.is_none()
            && self.card_type.is_none()
            && self.media.is_keep()
            && self.created_at.is_none()
    }
}

/// Read-only view of the media fields of an article, whichever type holds them
pub trait ArticleMedia {
    fn primary_media(&self) -> Option<&PrimaryMedia>;

    fn supporting_media(&self) -> &[SupportingMediaItem];

    fn image_urls(&self) -> &[String];

    fn legacy_media(&self) -> Option<&LegacyMedia> {
        None
    }
}

impl ArticleMedia for NormalizedContent {
    fn primary_media(&self) -> Option<&PrimaryMedia> {
        self.primary_media.as_ref()
    }

    fn supporting_media(&self) -> &[SupportingMediaItem] {
        &self.supporting_media
    }

    fn image_urls(&self) -> &[String] {
        &self.image_urls
    }
}

impl ArticleMedia for PersistedDocument {
    fn primary_media(&self) -> Option<&PrimaryMedia> {
        self.content.primary_media.as_ref()
    }

    fn supporting_media(&self) -> &[SupportingMediaItem] {
        &self.content.supporting_media
    }

    fn image_urls(&self) -> &[String] {
        &self.content.image_urls
    }

    fn legacy_media(&self) -> Option<&LegacyMedia> {
        self.media.as_ref()
    }
}
