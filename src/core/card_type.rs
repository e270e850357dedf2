//! Card layout classification.
//!
//! A pure decision table over five signals. The media itself is never
//! inspected; only whether there is any, and whether there is more than one
//! image.

use crate::domain::CardType;

use super::text::{line_count, text_length};

/// Longest body (in characters) that still fits as a media-only caption
pub const CAPTION_MAX_CHARS: usize = 200;

/// Most lines a media-only caption may have
pub const CAPTION_MAX_LINES: usize = 3;

/// The only inputs the card type may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSignals {
    pub has_media: bool,
    pub text_length: usize,
    pub line_count: usize,
    /// A typed title; metadata-derived titles never count
    pub has_user_title: bool,
    pub is_multi_image: bool,
}

impl CardSignals {
    /// Measure a body and combine with media facts
    pub fn measure(content: &str, has_media: bool, has_user_title: bool, image_count: usize) -> Self {
        Self {
            has_media,
            text_length: text_length(content),
            line_count: line_count(content),
            has_user_title,
            is_multi_image: image_count > 1,
        }
    }

    fn needs_truncation(&self) -> bool {
        self.text_length > CAPTION_MAX_CHARS || self.line_count > CAPTION_MAX_LINES
    }
}

/// Evaluate the decision table top to bottom; first match wins
pub fn classify_card(signals: &CardSignals) -> CardType {
    if !signals.has_media {
        return CardType::Hybrid;
    }

    // Content that needs truncation is never media-only
    if signals.needs_truncation() {
        return CardType::Hybrid;
    }

    // Multi-image gallery renderer relies on this row; kept separate from the one above
    if signals.is_multi_image && signals.needs_truncation() {
        return CardType::Hybrid;
    }

    if !signals.has_user_title {
        return CardType::MediaOnly;
    }

    CardType::Hybrid
}
