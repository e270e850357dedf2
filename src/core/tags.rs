//! Tag normalization.

use std::collections::HashSet;

use super::error::ValidationError;

/// Sentinel tag substituted when an edit would leave a record without tags
pub const FALLBACK_TAG: &str = "uncategorized";

/// Trim, drop blanks and dedupe case-insensitively.
///
/// The first occurrence of each tag keeps its casing and position. An empty
/// result is an error; this function never injects a fallback.
pub fn normalize_tags<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>, ValidationError> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for tag in raw {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            tags.push(trimmed.to_string());
        }
    }

    if tags.is_empty() {
        return Err(ValidationError::EmptyTagSet);
    }

    Ok(tags)
}

/// Edit-mode variant: an empty result becomes `[FALLBACK_TAG]`.
///
/// Returns the tags and whether the fallback was used.
pub fn normalize_tags_or_fallback<S: AsRef<str>>(raw: &[S]) -> (Vec<String>, bool) {
    match normalize_tags(raw) {
        Ok(tags) => (tags, false),
        Err(ValidationError::EmptyTagSet) => (vec![FALLBACK_TAG.to_string()], true),
    }
}
