//! Ingestion boundary.
//!
//! The only place that knows about the two stored schema generations. Past
//! this module every component works with [`MediaRef`]s and the resolved
//! [`ExistingMedia`] roles.

use crate::domain::{
    DiagnosticCode, Diagnostics, LegacyMedia, MediaKind, MediaOrigin, MediaRef, MetadataSource,
    PersistedDocument, PrimaryMedia, RawSubmission, SupportingMediaItem,
};

use super::classifier::{primary_from_ref, supporting_from_ref, FlagIndex};
use super::dedup::url_key;
use super::urls::classify_url;

/// References from a submission: pasted URLs first, then uploaded media.
///
/// Pasted URLs get their kind from URL heuristics. Uploaded media keep the
/// kind the client reported, unless it was `unknown`. Metadata sent with an
/// upload is marked as caller-supplied whatever source it claims; without any
/// details it counts as synthesized.
pub fn refs_from_submission(submission: &RawSubmission) -> Vec<MediaRef> {
    let pasted = submission
        .urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| MediaRef::new(classify_url(url), url, MediaOrigin::NewPrimary));

    let uploaded = submission
        .uploaded_media
        .iter()
        .filter(|media| !media.url.trim().is_empty())
        .map(|media| {
            let mut media = media.clone();
            media.url = media.url.trim().to_string();
            if media.kind == MediaKind::Unknown {
                media.kind = classify_url(&media.url);
            }
            if let Some(meta) = media.preview_metadata.as_mut() {
                meta.source = if meta.has_details() {
                    MetadataSource::Caller
                } else {
                    MetadataSource::Synthesized
                };
            }
            media
        });

    pasted.chain(uploaded).collect()
}

/// Stored media resolved into roles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingMedia {
    /// Current primary (from `primaryMedia`, else lifted from legacy `media`)
    pub primary: Option<PrimaryMedia>,

    pub supporting: Vec<SupportingMediaItem>,

    /// Flat image list
    pub flat_images: Vec<String>,

    /// The stored document still carries the legacy `media` field
    pub has_legacy_media: bool,
}

impl ExistingMedia {
    /// Resolve a stored document's media fields.
    ///
    /// Legacy `media` becomes the primary when `primaryMedia` is absent. When
    /// both are stored and point at different URLs, the legacy item is kept
    /// as a flat image (images) or a supporting item (anything else).
    pub fn from_document(doc: &PersistedDocument, diagnostics: &mut Diagnostics) -> Self {
        let content = &doc.content;
        let mut supporting = content.supporting_media.clone();
        let mut flat_images = content.image_urls.clone();

        let primary = match (&content.primary_media, &doc.media) {
            (Some(primary), Some(legacy)) => {
                let key = url_key(&legacy.url);
                let known = url_key(&primary.url) == key
                    || supporting.iter().any(|item| url_key(&item.url) == key)
                    || flat_images.iter().any(|url| url_key(url) == key);
                if !known {
                    let media = legacy_ref(legacy);
                    if media.kind.is_image() {
                        flat_images.push(media.url);
                    } else {
                        supporting.push(supporting_from_ref(&media, &FlagIndex::default()));
                    }
                    diagnostics.record(
                        DiagnosticCode::LegacyMediaMigrated,
                        format!("{} kept alongside primary media", legacy.url),
                    );
                }
                Some(primary.clone())
            }
            (Some(primary), None) => Some(primary.clone()),
            (None, Some(legacy)) => {
                diagnostics.record(
                    DiagnosticCode::LegacyMediaMigrated,
                    format!("{} lifted into primary media", legacy.url),
                );
                Some(primary_from_ref(&legacy_ref(legacy), &FlagIndex::default()))
            }
            (None, None) => None,
        };

        Self {
            primary,
            supporting,
            flat_images,
            has_legacy_media: doc.media.is_some(),
        }
    }
}

fn legacy_ref(legacy: &LegacyMedia) -> MediaRef {
    MediaRef {
        kind: legacy.kind,
        url: legacy.url.trim().to_string(),
        thumbnail: legacy.thumbnail_url.clone(),
        preview_metadata: legacy.preview_metadata.clone(),
        aspect_ratio: legacy.aspect_ratio.clone(),
        id: None,
        origin: MediaOrigin::LegacyMedia,
    }
}
