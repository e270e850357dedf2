//! Raw user submissions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{NormalizedContent, Visibility};
use super::media::{MasonryFlag, MediaOrigin, MediaRef};

/// What the user typed, pasted and uploaded in one create or edit action.
///
/// Ephemeral: built once per action and discarded after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubmission {
    /// Explicitly typed title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Markdown body
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub visibility: Visibility,

    /// Pasted URLs, in the order they were entered
    #[serde(default)]
    pub urls: Vec<String>,

    /// References to media already uploaded by the client
    #[serde(default)]
    pub uploaded_media: Vec<MediaRef>,

    /// Per-item gallery flags, keyed by item identity
    #[serde(default)]
    pub display_flags: Vec<MasonryFlag>,

    /// Admin-only creation date override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_created_at: Option<DateTime<Utc>>,

    /// URLs the caller explicitly deleted (edit only). Omission from `urls`
    /// is never a delete.
    #[serde(default)]
    pub deleted_urls: Vec<String>,
}

impl RawSubmission {
    /// Start a submission with body text and tags
    pub fn new<I, S>(content: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: content.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn with_flag(mut self, flag: MasonryFlag) -> Self {
        self.display_flags.push(flag);
        self
    }

    pub fn with_deleted_url(mut self, url: impl Into<String>) -> Self {
        self.deleted_urls.push(url.into());
        self
    }

    /// Rebuild the submission a user would send when resubmitting an
    /// already-normalized record unchanged.
    ///
    /// Primary and supporting items go back as uploaded media so their kind,
    /// thumbnail, metadata and identity survive. Only flat images held by
    /// neither are sent as pasted URLs.
    pub fn from_content(content: &NormalizedContent) -> Self {
        let mut uploaded_media = Vec::new();
        let mut display_flags = Vec::new();
        let mut held = HashSet::new();

        if let Some(primary) = &content.primary_media {
            uploaded_media.push(primary.to_ref(MediaOrigin::NewPrimary));
            display_flags.push(MasonryFlag::new(primary.id, primary.show_in_gallery));
            held.insert(primary.url.trim().to_lowercase());
        }
        for item in &content.supporting_media {
            uploaded_media.push(item.to_ref(MediaOrigin::NewSupporting));
            display_flags.push(MasonryFlag {
                item_id: item.id,
                show_in_gallery: item.show_in_gallery,
                gallery_caption: item.gallery_caption.clone(),
            });
            held.insert(item.url.trim().to_lowercase());
        }
        let urls = content
            .image_urls
            .iter()
            .filter(|url| !held.contains(&url.trim().to_lowercase()))
            .cloned()
            .collect();

        Self {
            title: content.title.clone(),
            content: content.content.clone(),
            tags: content.tags.clone(),
            visibility: content.visibility,
            urls,
            uploaded_media,
            display_flags,
            custom_created_at: content.created_at,
            deleted_urls: Vec::new(),
        }
    }
}
