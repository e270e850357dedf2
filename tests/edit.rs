//! Edit-mode Integration Tests
//!
//! Merging submissions into stored records without losing data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardnorm::adapters::{EnrichmentError, PreviewFetcher};
use cardnorm::core::{
    collect_all_image_urls, ContentNormalizer, NormalizeError, NormalizerSettings, FALLBACK_TAG,
};
use cardnorm::domain::{
    CardType, ContentId, DiagnosticCode, MasonryFlag, MediaItemId, MediaKind, MediaOrigin,
    MediaRef, MetadataSource, Patch, PersistedDocument, PreviewMetadata, RawSubmission,
};
use cardnorm::library::{ContentStore, MemoryContentStore};

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
            title: Some("Provider title".to_string()),
            image_url: Some("https://cdn.example.com/preview.png".to_string()),
            ..PreviewMetadata::minimal(url)
        })
    }
}

struct Harness {
    store: Arc<MemoryContentStore>,
    normalizer: ContentNormalizer,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryContentStore::new());
        let normalizer = ContentNormalizer::new(
            Arc::new(StaticFetcher),
            store.clone(),
            NormalizerSettings::default(),
        );
        Self { store, normalizer }
    }

    /// Create and persist a record
    async fn create(&self, submission: RawSubmission) -> PersistedDocument {
        let created = self
            .normalizer
            .normalize_for_create(submission)
            .await
            .unwrap()
            .value;
        self.store.insert(created).await.unwrap()
    }

    async fn seed_json(&self, json: serde_json::Value) -> PersistedDocument {
        let doc: PersistedDocument = serde_json::from_value(json).unwrap();
        self.store.put(doc.clone()).await;
        doc
    }
}

fn mixed_submission() -> RawSubmission {
    RawSubmission::new("A few words", ["travel"])
        .with_url("https://youtu.be/abc")
        .with_url("https://x.com/1.jpg")
        .with_url("https://x.com/2.jpg")
        .with_flag(MasonryFlag::for_url("https://x.com/2.jpg", true).with_caption("Beach"))
}

#[tokio::test]
async fn test_title_only_edit_keeps_media_identical() {
    let h = Harness::new();
    let doc = h
        .create(RawSubmission::new("short", ["x"]).with_url("https://example.com/a.jpg").with_url("https://x.com/b.png"))
        .await;

    let submission = RawSubmission::from_content(&doc.content).with_title("Now with a title");
    let payload = h
        .normalizer
        .normalize_for_edit(submission, &doc.id)
        .await
        .unwrap()
        .value;

    assert_eq!(payload.title, Patch::Set("Now with a title".to_string()));
    assert!(payload.primary_media.is_keep());
    assert!(payload.supporting_media.is_none());
    assert!(payload.image_urls.is_none());
    assert!(payload.content.is_none());
    assert!(payload.tags.is_none());
    assert_eq!(payload.card_type, Some(CardType::Hybrid));

    let updated = h.store.apply_update(&doc.id, &payload).await.unwrap();
    assert_eq!(
        serde_json::to_vec(&updated.content.primary_media).unwrap(),
        serde_json::to_vec(&doc.content.primary_media).unwrap()
    );
    assert_eq!(
        serde_json::to_vec(&updated.content.supporting_media).unwrap(),
        serde_json::to_vec(&doc.content.supporting_media).unwrap()
    );
    assert_eq!(updated.content.image_urls, doc.content.image_urls);
}

#[tokio::test]
async fn test_omitted_urls_are_not_deleted() {
    let h = Harness::new();
    let doc = h.create(mixed_submission()).await;

    // No urls and no flags: stored media and display state stay as they are
    let submission = RawSubmission::new("A few words", ["travel"]);
    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();

    assert!(result.value.is_empty());
    assert!(result.diagnostics.is_empty());

    let updated = h.store.apply_update(&doc.id, &result.value).await.unwrap();
    assert_eq!(updated.content.supporting_media.len(), 2);
    assert_eq!(
        updated.content.supporting_media[1].gallery_caption.as_deref(),
        Some("Beach")
    );
}

#[tokio::test]
async fn test_deleting_everything_clears_primary() {
    let h = Harness::new();
    let doc = h
        .create(RawSubmission::new("short", ["x"]).with_url("https://example.com/a.jpg"))
        .await;
    assert_eq!(doc.content.card_type, CardType::MediaOnly);

    let submission = RawSubmission::new("short", ["x"]).with_deleted_url("https://EXAMPLE.com/a.jpg");
    let payload = h
        .normalizer
        .normalize_for_edit(submission, &doc.id)
        .await
        .unwrap()
        .value;

    assert!(payload.primary_media.is_clear());
    assert_eq!(payload.image_urls, Some(Vec::new()));
    assert_eq!(payload.card_type, Some(CardType::Hybrid));

    let json = serde_json::to_value(&payload).unwrap();
    assert!(json["primaryMedia"].is_null());
    assert!(json.get("title").is_none());

    let updated = h.store.apply_update(&doc.id, &payload).await.unwrap();
    assert!(updated.content.primary_media.is_none());
    assert!(updated.content.image_urls.is_empty());
}

#[tokio::test]
async fn test_deleting_primary_promotes_and_enriches() {
    let h = Harness::new();
    let doc = h
        .create(
            RawSubmission::new("x", ["t"])
                .with_url("https://x.com/1.jpg")
                .with_url("https://example.com/story"),
        )
        .await;
    assert_eq!(doc.content.primary_media.as_ref().unwrap().kind, MediaKind::Image);

    let submission = RawSubmission::from_content(&doc.content).with_deleted_url("https://x.com/1.jpg");
    let payload = h
        .normalizer
        .normalize_for_edit(submission, &doc.id)
        .await
        .unwrap()
        .value;

    let primary = payload.primary_media.as_set().unwrap();
    assert_eq!(primary.url, "https://example.com/story");
    assert_eq!(primary.preview_metadata.source, MetadataSource::Provider);
    assert_eq!(primary.thumbnail.as_deref(), Some("https://cdn.example.com/preview.png"));
    assert_eq!(payload.supporting_media, Some(Vec::new()));
    assert_eq!(payload.image_urls, Some(Vec::new()));
}

#[tokio::test]
async fn test_new_url_never_replaces_existing_primary() {
    let h = Harness::new();
    let doc = h
        .create(RawSubmission::new("x", ["t"]).with_url("https://x.com/1.jpg"))
        .await;

    let submission = RawSubmission::from_content(&doc.content).with_url("https://youtu.be/abc");
    let payload = h
        .normalizer
        .normalize_for_edit(submission, &doc.id)
        .await
        .unwrap()
        .value;

    assert!(payload.primary_media.is_keep());
    let supporting = payload.supporting_media.unwrap();
    assert_eq!(supporting.len(), 1);
    assert_eq!(supporting[0].kind, MediaKind::VideoEmbed);
}

#[tokio::test]
async fn test_empty_tags_fall_back() {
    let h = Harness::new();
    let doc = h.create(mixed_submission()).await;

    let mut submission = RawSubmission::from_content(&doc.content);
    submission.tags = vec!["   ".to_string()];

    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();

    assert_eq!(result.value.tags, Some(vec![FALLBACK_TAG.to_string()]));
    assert!(result.diagnostics.contains(DiagnosticCode::TagFallbackApplied));
}

#[tokio::test]
async fn test_provider_metadata_survives_stale_resubmission() {
    let h = Harness::new();
    let doc = h.create(mixed_submission()).await;
    let primary = doc.content.primary_media.clone().unwrap();
    assert_eq!(primary.preview_metadata.title.as_deref(), Some("Provider title"));

    let mut submission = RawSubmission::from_content(&doc.content);
    submission.uploaded_media.push(
        MediaRef::new(MediaKind::Link, primary.url.clone(), MediaOrigin::NewPrimary).with_metadata(
            PreviewMetadata {
                title: Some("Old cached title".to_string()),
                ..PreviewMetadata::minimal(primary.url.clone())
            },
        ),
    );

    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();

    assert!(result.value.is_empty());
    assert_eq!(result.diagnostics.count(DiagnosticCode::MetadataPreservedOverride), 1);
}

#[tokio::test]
async fn test_caller_metadata_replaces_synthesized() {
    let h = Harness::new();
    let doc = h.create(mixed_submission()).await;
    let supporting_url = "https://x.com/1.jpg";

    let mut submission = RawSubmission::from_content(&doc.content);
    submission.uploaded_media.push(
        MediaRef::new(MediaKind::Image, supporting_url, MediaOrigin::NewSupporting).with_metadata(
            PreviewMetadata {
                title: Some("Sunset".to_string()),
                ..PreviewMetadata::minimal(supporting_url)
            },
        ),
    );

    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();
    let supporting = result.value.supporting_media.unwrap();
    let item = supporting.iter().find(|i| i.url == supporting_url).unwrap();

    assert_eq!(item.preview_metadata.title.as_deref(), Some("Sunset"));
    assert_eq!(item.preview_metadata.source, MetadataSource::Caller);
    assert!(!result.diagnostics.contains(DiagnosticCode::MetadataPreservedOverride));
}

#[tokio::test]
async fn test_legacy_document_migrates_flagged_images() {
    let h = Harness::new();
    let doc = h
        .seed_json(serde_json::json!({
            "id": "legacy-1",
            "content": "old post",
            "tags": ["archive"],
            "images": ["https://x.com/a.png", "https://x.com/b.png", "https://X.com/A.png"],
            "media": {"type": "image", "url": "https://x.com/a.png"}
        }))
        .await;

    let submission = RawSubmission::new("old post", ["archive"])
        .with_flag(MasonryFlag::for_url("https://x.com/b.png", true));

    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();
    let payload = result.value;

    assert!(result.diagnostics.contains(DiagnosticCode::LegacyMediaMigrated));
    assert!(result.diagnostics.contains(DiagnosticCode::ImageRelocated));
    assert_eq!(result.diagnostics.count(DiagnosticCode::DuplicateImageRemoved), 1);

    assert!(payload.media.is_clear());
    assert_eq!(payload.primary_media.as_set().unwrap().url, "https://x.com/a.png");
    let supporting = payload.supporting_media.clone().unwrap();
    assert_eq!(supporting.len(), 1);
    assert_eq!(supporting[0].url, "https://x.com/b.png");
    assert!(supporting[0].show_in_gallery);
    assert_eq!(payload.image_urls, Some(vec!["https://x.com/a.png".to_string()]));

    let updated = h.store.apply_update(&doc.id, &payload).await.unwrap();
    assert!(updated.media.is_none());
    let json = serde_json::to_value(&updated).unwrap();
    assert!(json.get("media").is_none());
    assert!(json.get("images").is_none());
}

#[tokio::test]
async fn test_legacy_media_beside_primary_survives_title_edit() {
    let h = Harness::new();
    let doc = h
        .seed_json(serde_json::json!({
            "id": "both-schemas",
            "content": "mixed generations",
            "tags": ["archive"],
            "primaryMedia": {
                "id": MediaItemId::for_url("https://x.com/new.jpg"),
                "kind": "image",
                "url": "https://x.com/new.jpg",
                "thumbnail": "https://x.com/new.jpg",
                "previewMetadata": {"url": "https://x.com/new.jpg"},
                "showInGallery": true
            },
            "imageUrls": ["https://x.com/new.jpg"],
            "media": {"type": "image", "url": "https://x.com/legacy.jpg"}
        }))
        .await;
    assert_eq!(
        collect_all_image_urls(&doc),
        vec!["https://x.com/new.jpg", "https://x.com/legacy.jpg"]
    );

    let submission = RawSubmission::from_content(&doc.content).with_title("Renamed");
    let result = h.normalizer.normalize_for_edit(submission, &doc.id).await.unwrap();
    assert!(result.diagnostics.contains(DiagnosticCode::LegacyMediaMigrated));
    assert!(result.value.media.is_clear());

    let updated = h.store.apply_update(&doc.id, &result.value).await.unwrap();
    assert!(updated.media.is_none());
    assert_eq!(updated.content.primary_media, doc.content.primary_media);
    assert_eq!(
        collect_all_image_urls(&updated),
        vec!["https://x.com/new.jpg", "https://x.com/legacy.jpg"]
    );

    let again = h
        .normalizer
        .normalize_for_edit(RawSubmission::from_content(&updated.content), &doc.id)
        .await
        .unwrap();
    assert!(again.value.is_empty(), "{:?}", again.value);
}

#[tokio::test]
async fn test_missing_record_is_stale_read() {
    let h = Harness::new();
    let err = h
        .normalizer
        .normalize_for_edit(RawSubmission::new("x", ["t"]), &ContentId::new("ghost"))
        .await
        .unwrap_err();

    match err {
        NormalizeError::StaleRead(e) => {
            assert_eq!(e.id, "ghost");
            assert_eq!(e.reason, "not found");
        }
        other => panic!("expected stale read, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_record_is_stale_read() {
    let h = Harness::new();
    let doc = h
        .seed_json(serde_json::json!({
            "id": "broken",
            "tags": ["t"],
            "supportingMedia": [{
                "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
                "kind": "image",
                "url": "  ",
                "previewMetadata": {"url": ""}
            }]
        }))
        .await;

    let err = h
        .normalizer
        .normalize_for_edit(RawSubmission::new("x", ["t"]), &doc.id)
        .await
        .unwrap_err();

    assert!(matches!(err, NormalizeError::StaleRead(_)));
}
