//! Content normalizer.
//!
//! Runs tag cleanup, dedup, media classification and card typing in two
//! modes:
//! - create: build a complete record from a submission
//! - edit: merge a submission into a stored record without losing anything
//!   the user did not explicitly delete, and emit only what changed
//!
//! The normalizer never writes. Persisting a result is the caller's job.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::adapters::{EnrichmentError, PreviewFetcher};
use crate::config::{ResolvedConfig, DEFAULT_ENRICH_TIMEOUT_MS};
use crate::domain::{
    CardType, ContentId, DiagnosticCode, Diagnostics, MediaItemId, MediaKind, MediaOrigin,
    MediaRef, MetadataSource, Normalized, NormalizedContent, Patch, PersistedDocument,
    PreviewMetadata, PrimaryMedia, RawSubmission, SupportingMediaItem, UpdatePayload,
};
use crate::library::ContentStore;

use super::card_type::{classify_card, CardSignals};
use super::classifier::{
    classify, collect_all_image_urls, primary_from_ref, select_primary, supporting_from_ref,
    FlagIndex,
};
use super::dedup::{dedupe_for_create, dedupe_for_edit, url_key};
use super::error::{NormalizeError, StaleReadError};
use super::ingest::{refs_from_submission, ExistingMedia};
use super::tags::{normalize_tags, normalize_tags_or_fallback, FALLBACK_TAG};
use super::text::{excerpt, read_time_minutes};

/// Knobs for a [`ContentNormalizer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerSettings {
    /// Hard bound on a single enrichment call
    pub enrichment_timeout: Duration,

    /// When false, primaries keep minimal metadata and no lookup happens
    pub enrich: bool,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            enrichment_timeout: Duration::from_millis(DEFAULT_ENRICH_TIMEOUT_MS),
            enrich: true,
        }
    }
}

impl NormalizerSettings {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            enrichment_timeout: Duration::from_millis(config.enrichment.timeout_ms),
            enrich: config.enrichment.enabled,
        }
    }
}

/// Turns raw submissions into canonical records and edit payloads
pub struct ContentNormalizer {
    fetcher: Arc<dyn PreviewFetcher>,
    store: Arc<dyn ContentStore>,
    settings: NormalizerSettings,
}

impl ContentNormalizer {
    pub fn new(
        fetcher: Arc<dyn PreviewFetcher>,
        store: Arc<dyn ContentStore>,
        settings: NormalizerSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Build a complete record from a new submission
    #[instrument(
        skip(self, submission),
        fields(urls = submission.urls.len(), uploads = submission.uploaded_media.len())
    )]
    pub async fn normalize_for_create(
        &self,
        submission: RawSubmission,
    ) -> Result<Normalized<NormalizedContent>, NormalizeError> {
        let mut diagnostics = Diagnostics::new();

        let tags = normalize_tags(&submission.tags)?;

        let refs = refs_from_submission(&submission);
        dedupe_for_create(refs.iter().filter(|r| r.kind.is_image()).map(|r| r.url.as_str()))
            .report(&mut diagnostics);
        let refs = first_per_url(refs);

        let flags = FlagIndex::new(&submission.display_flags);
        let mut classification = classify(&refs, &flags);

        if let Some(primary) = classification.primary.as_mut() {
            if needs_enrichment(primary) {
                self.enrich_primary(primary, &mut diagnostics).await;
            }
        }

        let supporting_keys: HashSet<String> = classification
            .supporting
            .iter()
            .map(|item| url_key(&item.url))
            .collect();
        let image_urls = refs
            .iter()
            .filter(|r| r.kind.is_image() && !supporting_keys.contains(&url_key(&r.url)))
            .map(|r| r.url.clone())
            .collect();

        let content = submission.content;
        let mut record = NormalizedContent {
            title: clean_title(submission.title.as_deref()),
            excerpt: excerpt(&content),
            read_time: read_time_minutes(&content),
            content,
            tags,
            visibility: submission.visibility,
            primary_media: classification.primary,
            supporting_media: classification.supporting,
            image_urls,
            card_type: CardType::default(),
            created_at: submission.custom_created_at,
        };
        record.card_type = card_type_for(&record);

        info!(
            card_type = %record.card_type,
            supporting = record.supporting_media.len(),
            diagnostics = diagnostics.len(),
            "Normalized new content"
        );

        Ok(Normalized::new(record, diagnostics))
    }

    /// Load a stored record and merge an edit submission into it
    #[instrument(skip(self, submission, id), fields(id = %id))]
    pub async fn normalize_for_edit(
        &self,
        submission: RawSubmission,
        id: &ContentId,
    ) -> Result<Normalized<UpdatePayload>, NormalizeError> {
        let existing = match self.store.load_existing_content(id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(StaleReadError::new(id.as_str(), "not found").into()),
            Err(e) => return Err(StaleReadError::new(id.as_str(), format!("{:#}", e)).into()),
        };

        existing
            .validate()
            .map_err(|reason| StaleReadError::new(id.as_str(), reason))?;

        Ok(self.merge_edit(submission, &existing).await)
    }

    /// Merge an edit submission into an already loaded record.
    ///
    /// The submission carries the full form state for text fields. Media are
    /// merged: nothing stored is dropped unless listed in `deleted_urls`.
    pub async fn merge_edit(
        &self,
        submission: RawSubmission,
        existing: &PersistedDocument,
    ) -> Normalized<UpdatePayload> {
        let mut diagnostics = Diagnostics::new();

        let (tags, fallback) = normalize_tags_or_fallback(&submission.tags);
        if fallback {
            diagnostics.record(
                DiagnosticCode::TagFallbackApplied,
                format!("no tags left on {}, using '{}'", existing.id, FALLBACK_TAG),
            );
        }

        let stored = ExistingMedia::from_document(existing, &mut diagnostics);

        let deleted: HashSet<String> = submission
            .deleted_urls
            .iter()
            .map(|url| url_key(url))
            .filter(|key| !key.is_empty())
            .collect();
        let kept = |url: &str| !deleted.contains(&url_key(url));

        let mut primary = stored.primary.filter(|p| kept(&p.url));
        let mut supporting: Vec<SupportingMediaItem> =
            stored.supporting.into_iter().filter(|item| kept(&item.url)).collect();
        let flat: Vec<String> = stored.flat_images.into_iter().filter(|url| kept(url)).collect();

        let flags = FlagIndex::new(&submission.display_flags);
        apply_flags(&flags, primary.as_mut(), &mut supporting);

        // Incoming references: known URLs only get their metadata reconciled
        let mut known: HashSet<String> = primary
            .iter()
            .map(|p| url_key(&p.url))
            .chain(supporting.iter().map(|item| url_key(&item.url)))
            .chain(flat.iter().map(|url| url_key(url)))
            .collect();
        let mut new_refs = Vec::new();
        for incoming in refs_from_submission(&submission) {
            let key = url_key(&incoming.url);
            if deleted.contains(&key) {
                continue;
            }
            if known.contains(&key) {
                if let Some(meta) = &incoming.preview_metadata {
                    reconcile_known_metadata(
                        &key,
                        meta,
                        primary.as_mut(),
                        &mut supporting,
                        &mut diagnostics,
                    );
                }
                continue;
            }
            known.insert(key);
            new_refs.push(incoming);
        }

        if primary.is_none() {
            primary = self
                .promote_primary(&mut supporting, &flat, &mut new_refs, &flags, &mut diagnostics)
                .await;
        }

        move_flagged_flat_images(&flags, primary.as_ref(), &flat, &mut supporting);
        supporting.extend(new_refs.iter().map(|r| supporting_from_ref(r, &flags)));

        // The primary image belongs in the flat list
        let primary_image: Vec<&str> = primary
            .iter()
            .filter(|p| p.kind.is_image() && !flat.iter().any(|url| url_key(url) == url_key(&p.url)))
            .map(|p| p.url.as_str())
            .collect();
        let flat_outcome = dedupe_for_edit(&flat, &primary_image, &supporting);
        flat_outcome.report(&mut diagnostics);

        let content = submission.content;
        let mut next = NormalizedContent {
            title: clean_title(submission.title.as_deref()),
            excerpt: excerpt(&content),
            read_time: read_time_minutes(&content),
            content,
            tags,
            visibility: submission.visibility,
            primary_media: primary,
            supporting_media: supporting,
            image_urls: flat_outcome.urls,
            card_type: CardType::default(),
            created_at: submission.custom_created_at,
        };
        next.card_type = card_type_for(&next);

        let payload = diff_payload(existing, next);

        info!(
            id = %existing.id,
            unchanged = payload.is_empty(),
            diagnostics = diagnostics.len(),
            "Merged edit"
        );

        Normalized::new(payload, diagnostics)
    }

    /// Pick a new primary when the stored one is gone.
    ///
    /// Candidates in order: supporting items, flat images, new references.
    /// A promoted flat image stays in the flat list. A promoted item keeps
    /// any display flag the submission sent for it.
    async fn promote_primary(
        &self,
        supporting: &mut Vec<SupportingMediaItem>,
        flat: &[String],
        new_refs: &mut Vec<MediaRef>,
        flags: &FlagIndex,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrimaryMedia> {
        let mut pool: Vec<MediaRef> = supporting
            .iter()
            .map(|item| item.to_ref(MediaOrigin::NewSupporting))
            .collect();
        pool.extend(
            flat.iter()
                .map(|url| MediaRef::new(MediaKind::Image, url.as_str(), MediaOrigin::LegacyImageList)),
        );
        pool.extend(new_refs.iter().cloned());

        let index = select_primary(&pool)?;
        let mut promoted = primary_from_ref(&pool[index], flags);

        let supporting_len = supporting.len();
        if index < supporting_len {
            supporting.remove(index);
        } else if index >= supporting_len + flat.len() {
            new_refs.remove(index - supporting_len - flat.len());
        }

        debug!(url = %promoted.url, kind = %promoted.kind, "Promoted new primary");

        if needs_enrichment(&promoted) {
            self.enrich_primary(&mut promoted, diagnostics).await;
        }

        Some(promoted)
    }

    /// Fetch preview metadata for the primary under a hard timeout.
    ///
    /// Failure of any kind keeps the existing metadata and records
    /// `EnrichmentDegraded`.
    async fn enrich_primary(&self, primary: &mut PrimaryMedia, diagnostics: &mut Diagnostics) {
        if !self.settings.enrich {
            debug!(url = %primary.url, "Enrichment disabled");
            return;
        }

        let timeout = self.settings.enrichment_timeout;
        let lookup = self.fetcher.fetch_preview_metadata(&primary.url, timeout);
        let result = match tokio::time::timeout(timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(EnrichmentError::Timeout(timeout)),
        };

        match result {
            Ok(mut metadata) => {
                metadata.url = primary.url.clone();
                metadata.source = MetadataSource::Provider;
                if primary.thumbnail.is_none() {
                    primary.thumbnail = metadata.image_url.clone();
                }
                debug!(url = %primary.url, fetcher = self.fetcher.name(), "Enriched primary media");
                primary.preview_metadata = metadata;
            }
            Err(e) => {
                warn!(
                    url = %primary.url,
                    fetcher = self.fetcher.name(),
                    error = %e,
                    "Enrichment degraded, keeping minimal metadata"
                );
                diagnostics.record(
                    DiagnosticCode::EnrichmentDegraded,
                    format!("{}: {}", primary.url, e),
                );
            }
        }
    }
}

/// Link-like primaries without provider metadata get looked up
fn needs_enrichment(primary: &PrimaryMedia) -> bool {
    !primary.kind.is_image() && !primary.preview_metadata.is_externally_sourced()
}

fn clean_title(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Keep the first reference for each URL key
fn first_per_url(refs: Vec<MediaRef>) -> Vec<MediaRef> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|r| seen.insert(url_key(&r.url)))
        .collect()
}

fn card_type_for(record: &NormalizedContent) -> CardType {
    let has_media = record.primary_media.is_some()
        || !record.supporting_media.is_empty()
        || !record.image_urls.is_empty();
    let signals = CardSignals::measure(
        &record.content,
        has_media,
        record.title.is_some(),
        collect_all_image_urls(record).len(),
    );
    classify_card(&signals)
}

/// Submitted flags override stored display state, matched by item id
fn apply_flags(
    flags: &FlagIndex,
    primary: Option<&mut PrimaryMedia>,
    supporting: &mut [SupportingMediaItem],
) {
    if let Some(primary) = primary {
        if let Some(flag) = flags.get(&primary.id) {
            primary.show_in_gallery = flag.show_in_gallery;
        }
    }
    for item in supporting.iter_mut() {
        if let Some(flag) = flags.get(&item.id) {
            item.apply_flag(flag);
        }
    }
}

/// Flat images flagged for the gallery become supporting items
fn move_flagged_flat_images(
    flags: &FlagIndex,
    primary: Option<&PrimaryMedia>,
    flat: &[String],
    supporting: &mut Vec<SupportingMediaItem>,
) {
    let primary_key = primary.map(|p| url_key(&p.url));
    for url in flat {
        let shown = flags
            .get(&MediaItemId::for_url(url))
            .map_or(false, |flag| flag.show_in_gallery);
        if !shown {
            continue;
        }
        let key = url_key(url);
        if primary_key.as_deref() == Some(key.as_str())
            || supporting.iter().any(|item| url_key(&item.url) == key)
        {
            continue;
        }
        let media = MediaRef::new(MediaKind::Image, url.as_str(), MediaOrigin::LegacyImageList);
        supporting.push(supporting_from_ref(&media, flags));
    }
}

/// Incoming metadata for an already stored URL.
///
/// Provider metadata is never overwritten. Anything else may be replaced by
/// caller-supplied details.
fn reconcile_known_metadata(
    key: &str,
    incoming: &PreviewMetadata,
    primary: Option<&mut PrimaryMedia>,
    supporting: &mut [SupportingMediaItem],
    diagnostics: &mut Diagnostics,
) {
    let target = match primary {
        Some(p) if url_key(&p.url) == key => Some((p.url.clone(), &mut p.preview_metadata)),
        _ => supporting
            .iter_mut()
            .find(|item| url_key(&item.url) == key)
            .map(|item| (item.url.clone(), &mut item.preview_metadata)),
    };
    let Some((url, current)) = target else {
        return;
    };

    if current.same_details(incoming) {
        return;
    }

    if current.is_externally_sourced() {
        diagnostics.record(
            DiagnosticCode::MetadataPreservedOverride,
            format!("kept provider metadata for {}", url),
        );
        return;
    }

    if incoming.has_details() {
        *current = PreviewMetadata {
            url,
            source: MetadataSource::Caller,
            ..incoming.clone()
        };
    }
}

fn changed<T: PartialEq>(current: &T, next: T) -> Option<T> {
    (*current != next).then_some(next)
}

/// Only the fields whose value differs from the stored record
fn diff_payload(existing: &PersistedDocument, next: NormalizedContent) -> UpdatePayload {
    let current = &existing.content;
    UpdatePayload {
        title: Patch::diff(current.title.as_ref(), next.title),
        content: changed(&current.content, next.content),
        excerpt: changed(&current.excerpt, next.excerpt),
        read_time: changed(&current.read_time, next.read_time),
        tags: changed(&current.tags, next.tags),
        visibility: changed(&current.visibility, next.visibility),
        primary_media: Patch::diff(current.primary_media.as_ref(), next.primary_media),
        supporting_media: changed(&current.supporting_media, next.supporting_media),
        image_urls: changed(&current.image_urls, next.image_urls),
        card_type: changed(&current.card_type, next.card_type),
        media: if existing.media.is_some() {
            Patch::Clear
        } else {
            Patch::Keep
        },
        created_at: next
            .created_at
            .filter(|created| current.created_at != Some(*created)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DisabledPreviewFetcher;
    use crate::domain::MasonryFlag;
    use crate::library::MemoryContentStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticFetcher;

    #[async_trait]
    impl PreviewFetcher for StaticFetcher {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_preview_metadata(
            &self,
            url: &str,
            _timeout: Duration,
        ) -> Result<PreviewMetadata, EnrichmentError> {
            Ok(PreviewMetadata {
                title: Some(format!("Title of {}", url)),
                image_url: Some("https://cdn.example.com/og.png".to_string()),
                ..PreviewMetadata::minimal(url)
            })
        }
    }

    fn normalizer(fetcher: Arc<dyn PreviewFetcher>) -> ContentNormalizer {
        ContentNormalizer::new(
            fetcher,
            Arc::new(MemoryContentStore::new()),
            NormalizerSettings::default(),
        )
    }

    fn stored(content: NormalizedContent) -> PersistedDocument {
        PersistedDocument::from_normalized(ContentId::new("doc"), content, Utc::now())
    }

    #[tokio::test]
    async fn test_create_enriches_link_primary() {
        let n = normalizer(Arc::new(StaticFetcher));
        let submission = RawSubmission::new("short note", ["news"]).with_url("https://example.com/story");

        let result = n.normalize_for_create(submission).await.unwrap();
        let primary = result.value.primary_media.as_ref().unwrap();

        assert_eq!(primary.kind, MediaKind::Link);
        assert_eq!(primary.preview_metadata.source, MetadataSource::Provider);
        assert_eq!(primary.thumbnail.as_deref(), Some("https://cdn.example.com/og.png"));
        assert_eq!(result.value.title, None);
        assert_eq!(
            result.value.display_title(),
            Some("Title of https://example.com/story")
        );
        assert!(result.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_create_degrades_without_fetcher() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let submission = RawSubmission::new("", ["a"]).with_url("https://example.com/story");

        let result = n.normalize_for_create(submission).await.unwrap();
        let primary = result.value.primary_media.unwrap();

        assert_eq!(primary.preview_metadata, PreviewMetadata::minimal("https://example.com/story"));
        assert!(result.diagnostics.contains(DiagnosticCode::EnrichmentDegraded));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_tags() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let err = n
            .normalize_for_create(RawSubmission::new("x", [" ", ""]))
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_flat_list_holds_only_primary_image() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let submission = RawSubmission::new("pics", ["p"])
            .with_url("https://x.com/1.jpg")
            .with_url("https://x.com/2.jpg")
            .with_url("https://X.com/1.JPG");

        let result = n.normalize_for_create(submission).await.unwrap();
        let record = result.value;

        assert_eq!(record.image_urls, vec!["https://x.com/1.jpg"]);
        assert_eq!(record.supporting_media.len(), 1);
        assert_eq!(result.diagnostics.count(DiagnosticCode::DuplicateImageRemoved), 1);
        assert_eq!(record.card_type, CardType::MediaOnly);
    }

    #[tokio::test]
    async fn test_edit_fallback_tag() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let doc = stored(NormalizedContent {
            content: "body".to_string(),
            tags: vec!["old".to_string()],
            ..Default::default()
        });
        let submission = RawSubmission {
            content: "body".to_string(),
            ..Default::default()
        };

        let result = n.merge_edit(submission, &doc).await;

        assert_eq!(result.value.tags, Some(vec![FALLBACK_TAG.to_string()]));
        assert!(result.diagnostics.contains(DiagnosticCode::TagFallbackApplied));
    }

    #[tokio::test]
    async fn test_edit_deleting_primary_promotes_supporting() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let created = n
            .normalize_for_create(
                RawSubmission::new("", ["t"])
                    .with_url("https://youtu.be/abc")
                    .with_url("https://x.com/doc.pdf"),
            )
            .await
            .unwrap()
            .value;
        let doc = stored(created.clone());

        let submission = RawSubmission::from_content(&doc.content).with_deleted_url("https://youtu.be/abc");
        let payload = n.merge_edit(submission, &doc).await.value;

        let primary = payload.primary_media.as_set().unwrap();
        assert_eq!(primary.kind, MediaKind::Document);
        assert_eq!(primary.url, "https://x.com/doc.pdf");
        assert_eq!(payload.supporting_media, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_edit_preserves_provider_metadata() {
        let n = normalizer(Arc::new(StaticFetcher));
        let created = n
            .normalize_for_create(RawSubmission::new("", ["t"]).with_url("https://example.com/story"))
            .await
            .unwrap()
            .value;
        let doc = stored(created);

        let mut submission = RawSubmission::from_content(&doc.content);
        submission.uploaded_media.push(
            MediaRef::new(MediaKind::Link, "https://example.com/story", MediaOrigin::NewPrimary)
                .with_metadata(PreviewMetadata {
                    title: Some("Stale".to_string()),
                    ..PreviewMetadata::minimal("https://example.com/story")
                }),
        );

        let result = n.merge_edit(submission, &doc).await;

        assert!(result.value.is_empty());
        assert!(result.diagnostics.contains(DiagnosticCode::MetadataPreservedOverride));
    }

    #[tokio::test]
    async fn test_edit_moves_flagged_flat_image() {
        let n = normalizer(Arc::new(DisabledPreviewFetcher));
        let doc = stored(NormalizedContent {
            content: "x".to_string(),
            tags: vec!["t".to_string()],
            image_urls: vec!["https://x.com/a.png".to_string(), "https://x.com/b.png".to_string()],
            ..Default::default()
        });
        let submission = RawSubmission::new("x", ["t"])
            .with_flag(MasonryFlag::for_url("https://x.com/b.png", true).with_caption("Bee"));

        let result = n.merge_edit(submission, &doc).await;
        let payload = result.value;

        let primary = payload.primary_media.as_set().unwrap();
        assert_eq!(primary.url, "https://x.com/a.png");

        let supporting = payload.supporting_media.unwrap();
        assert_eq!(supporting.len(), 1);
        assert_eq!(supporting[0].url, "https://x.com/b.png");
        assert!(supporting[0].show_in_gallery);
        assert_eq!(supporting[0].gallery_caption.as_deref(), Some("Bee"));

        assert_eq!(payload.image_urls, Some(vec!["https://x.com/a.png".to_string()]));
        assert!(result.diagnostics.contains(DiagnosticCode::ImageRelocated));
        assert!(!result.diagnostics.contains(DiagnosticCode::DuplicateImageRemoved));
    }
}
