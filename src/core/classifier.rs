//! Media classification.
//!
//! Picks one primary item by kind priority and bins everything else as
//! supporting. Display flags are looked up by [`MediaItemId`], never by the
//! position of an item in a list.

use std::collections::HashMap;

use crate::domain::media::clean_caption;
use crate::domain::{
    ArticleMedia, MasonryFlag, MediaItemId, MediaKind, MediaRef, PrimaryMedia, SupportingMediaItem,
};

use super::dedup::dedupe_for_create;
use super::urls::derived_video_thumbnail;

/// Outcome of classifying a bag of references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaClassification {
    pub primary: Option<PrimaryMedia>,
    pub supporting: Vec<SupportingMediaItem>,
}

/// Display flags indexed by item identity
#[derive(Debug, Clone, Default)]
pub struct FlagIndex {
    flags: HashMap<MediaItemId, MasonryFlag>,
}

impl FlagIndex {
    /// Later flags for the same item replace earlier ones
    pub fn new<'a>(flags: impl IntoIterator<Item = &'a MasonryFlag>) -> Self {
        let mut index = Self::default();
        index.extend(flags);
        index
    }

    pub fn extend<'a>(&mut self, flags: impl IntoIterator<Item = &'a MasonryFlag>) {
        for flag in flags {
            self.flags.insert(flag.item_id, flag.clone());
        }
    }

    pub fn get(&self, id: &MediaItemId) -> Option<&MasonryFlag> {
        self.flags.get(id)
    }
}

/// Index of the highest-priority reference; ties go to the first occurrence
pub fn select_primary(refs: &[MediaRef]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (index, media) in refs.iter().enumerate() {
        let priority = media.kind.priority();
        if best.map_or(true, |(_, top)| priority > top) {
            best = Some((index, priority));
        }
    }
    best.map(|(index, _)| index)
}

/// Thumbnail fixed at first classification
fn initial_thumbnail(media: &MediaRef) -> Option<String> {
    if let Some(thumbnail) = &media.thumbnail {
        return Some(thumbnail.clone());
    }
    match media.kind {
        MediaKind::VideoEmbed => derived_video_thumbnail(&media.url),
        MediaKind::Image => Some(media.url.clone()),
        _ => media
            .preview_metadata
            .as_ref()
            .and_then(|meta| meta.image_url.clone()),
    }
}

/// Build the primary item. Shown in the gallery unless a flag says otherwise.
pub fn primary_from_ref(media: &MediaRef, flags: &FlagIndex) -> PrimaryMedia {
    let id = media.item_id();
    PrimaryMedia {
        id,
        kind: media.kind,
        url: media.url.trim().to_string(),
        thumbnail: initial_thumbnail(media),
        preview_metadata: media.metadata_or_minimal(),
        aspect_ratio: media.aspect_ratio.clone(),
        show_in_gallery: flags.get(&id).map_or(true, |flag| flag.show_in_gallery),
    }
}

/// Build a supporting item. Hidden from the gallery unless flagged.
pub fn supporting_from_ref(media: &MediaRef, flags: &FlagIndex) -> SupportingMediaItem {
    let id = media.item_id();
    let flag = flags.get(&id);
    SupportingMediaItem {
        id,
        kind: media.kind,
        url: media.url.trim().to_string(),
        thumbnail: initial_thumbnail(media),
        preview_metadata: media.metadata_or_minimal(),
        aspect_ratio: media.aspect_ratio.clone(),
        show_in_gallery: flag.map_or(false, |f| f.show_in_gallery),
        gallery_caption: flag.and_then(|f| clean_caption(f.gallery_caption.as_deref())),
    }
}

/// Select the primary and bin the rest as supporting
pub fn classify(refs: &[MediaRef], flags: &FlagIndex) -> MediaClassification {
    let Some(primary_index) = select_primary(refs) else {
        return MediaClassification::default();
    };

    let supporting = refs
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != primary_index)
        .map(|(_, media)| supporting_from_ref(media, flags))
        .collect();

    MediaClassification {
        primary: Some(primary_from_ref(&refs[primary_index], flags)),
        supporting,
    }
}

/// Stable thumbnail for an article.
///
/// Order: stored primary thumbnail, derived video thumbnail, image primary
/// URL, legacy media by the same rules, then the first flat image.
pub fn resolve_thumbnail<A: ArticleMedia + ?Sized>(article: &A) -> Option<String> {
    if let Some(primary) = article.primary_media() {
        if let Some(thumbnail) = &primary.thumbnail {
            return Some(thumbnail.clone());
        }
        match primary.kind {
            MediaKind::VideoEmbed => {
                if let Some(derived) = derived_video_thumbnail(&primary.url) {
                    return Some(derived);
                }
            }
            MediaKind::Image => return Some(primary.url.clone()),
            _ => {}
        }
    }

    if let Some(legacy) = article.legacy_media() {
        if let Some(thumbnail) = &legacy.thumbnail_url {
            return Some(thumbnail.clone());
        }
        match legacy.kind {
            MediaKind::VideoEmbed => {
                if let Some(derived) = derived_video_thumbnail(&legacy.url) {
                    return Some(derived);
                }
            }
            MediaKind::Image => return Some(legacy.url.clone()),
            _ => {}
        }
    }

    article.image_urls().first().cloned()
}

/// Every viewable image across primary, supporting, flat and legacy fields
pub fn collect_all_image_urls<A: ArticleMedia + ?Sized>(article: &A) -> Vec<String> {
    let primary = article
        .primary_media()
        .filter(|p| p.kind.is_image())
        .map(|p| p.url.as_str());
    let supporting = article
        .supporting_media()
        .iter()
        .filter(|item| item.kind.is_image())
        .map(|item| item.url.as_str());
    let flat = article.image_urls().iter().map(String::as_str);
    let legacy = article
        .legacy_media()
        .filter(|m| m.kind.is_image())
        .map(|m| m.url.as_str());

    dedupe_for_create(primary.into_iter().chain(supporting).chain(flat).chain(legacy)).urls
}
