//! Image URL deduplication.
//!
//! Two policies share one equality rule (trimmed, case-insensitive, first-seen
//! casing wins):
//! - create: plain unique-by-first-seen over one list
//! - edit: nothing already stored may be lost; only relocation into
//!   supporting media takes a URL out of the flat list
//!
//! Duplicates are never errors. Every removal is recorded so the caller can
//! turn it into diagnostics.

use std::collections::{HashMap, HashSet};

use crate::domain::{DiagnosticCode, Diagnostics, SupportingMediaItem};

/// Comparison key for a URL
pub fn url_key(url: &str) -> String {
    url.trim().to_lowercase()
}

/// A dropped duplicate and the occurrence that was kept instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDuplicate {
    pub removed: String,
    pub kept: String,
}

/// Result of a dedup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Surviving URLs, in order
    pub urls: Vec<String>,

    /// Duplicates that were dropped
    pub removed: Vec<RemovedDuplicate>,

    /// Existing URLs taken out of the flat list because supporting media now holds them
    pub relocated: Vec<String>,
}

impl DedupOutcome {
    /// Record removals and relocations
    pub fn report(&self, diagnostics: &mut Diagnostics) {
        for dup in &self.removed {
            diagnostics.record(
                DiagnosticCode::DuplicateImageRemoved,
                format!("removed {} (kept {})", dup.removed, dup.kept),
            );
        }
        for url in &self.relocated {
            diagnostics.record(
                DiagnosticCode::ImageRelocated,
                format!("{} moved to supporting media", url),
            );
        }
    }
}

/// Keeps the first-seen spelling of every key
#[derive(Default)]
struct SeenUrls {
    kept: HashMap<String, String>,
}

impl SeenUrls {
    /// Returns the already-kept spelling if `url` is a duplicate
    fn check_and_insert(&mut self, url: &str) -> Option<String> {
        let key = url_key(url);
        if let Some(kept) = self.kept.get(&key) {
            return Some(kept.clone());
        }
        self.kept.insert(key, url.trim().to_string());
        None
    }
}

/// Unique-by-first-seen over a single combined list
pub fn dedupe_for_create<I, S>(urls: I) -> DedupOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = SeenUrls::default();
    let mut outcome = DedupOutcome::default();

    for url in urls {
        let url = url.as_ref().trim();
        if url.is_empty() {
            continue;
        }
        match seen.check_and_insert(url) {
            Some(kept) => outcome.removed.push(RemovedDuplicate {
                removed: url.to_string(),
                kept,
            }),
            None => outcome.urls.push(url.to_string()),
        }
    }

    outcome
}

/// Edit-safe merge of the stored flat list with newly submitted URLs.
///
/// Every `existing` URL survives unless `supporting` holds it (relocated).
/// New `incoming` URLs are appended when neither preserved nor held by
/// `supporting`. A URL missing from `incoming` is never dropped.
pub fn dedupe_for_edit<E, I>(
    existing: &[E],
    incoming: &[I],
    supporting: &[SupportingMediaItem],
) -> DedupOutcome
where
    E: AsRef<str>,
    I: AsRef<str>,
{
    let supporting_keys: HashSet<String> = supporting.iter().map(|item| url_key(&item.url)).collect();
    let mut seen = SeenUrls::default();
    let mut outcome = DedupOutcome::default();

    for url in existing {
        let url = url.as_ref().trim();
        if url.is_empty() {
            continue;
        }
        if supporting_keys.contains(&url_key(url)) {
            outcome.relocated.push(url.to_string());
            continue;
        }
        match seen.check_and_insert(url) {
            Some(kept) => outcome.removed.push(RemovedDuplicate {
                removed: url.to_string(),
                kept,
            }),
            None => outcome.urls.push(url.to_string()),
        }
    }

    for url in incoming {
        let url = url.as_ref().trim();
        if url.is_empty() || supporting_keys.contains(&url_key(url)) {
            continue;
        }
        match seen.check_and_insert(url) {
            Some(kept) => outcome.removed.push(RemovedDuplicate {
                removed: url.to_string(),
                kept,
            }),
            None => outcome.urls.push(url.to_string()),
        }
    }

    outcome
}
