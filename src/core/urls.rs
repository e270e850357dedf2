//! URL heuristics: media kind detection and provider video ids.

use url::Url;

use crate::domain::MediaKind;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "svg", "bmp", "heic", "heif", "tif", "tiff",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "odt", "ods", "odp", "rtf", "epub",
];

/// Hosts that serve images without a file extension in the path
const IMAGE_HOSTS: &[&str] = &[
    "images.unsplash.com",
    "i.imgur.com",
    "pbs.twimg.com",
    "res.cloudinary.com",
    "lh3.googleusercontent.com",
    "i.redd.it",
];

/// Video providers we can embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoProvider {
    YouTube,
    Vimeo,
}

/// A provider-specific video identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId {
    pub provider: VideoProvider,
    pub id: String,
}

impl VideoId {
    /// Thumbnail URL constructed from the id, when the provider offers a
    /// stable scheme for it
    pub fn thumbnail_url(&self) -> Option<String> {
        match self.provider {
            VideoProvider::YouTube => Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.id)),
            VideoProvider::Vimeo => None,
        }
    }
}

fn parse(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

fn host_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn extension_of(url: &Url) -> Option<String> {
    let last = url.path_segments()?.last()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn is_youtube_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 64
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a provider video id from an embeddable video URL
pub fn video_id(raw: &str) -> Option<VideoId> {
    let url = parse(raw)?;
    let host = host_of(&url);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let youtube = |id: &str| {
        is_youtube_id(id).then(|| VideoId {
            provider: VideoProvider::YouTube,
            id: id.to_string(),
        })
    };

    match host.as_str() {
        "youtu.be" => segments.first().and_then(|id| youtube(*id)),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            match segments.as_slice() {
                ["watch", ..] => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .and_then(|(_, v)| youtube(v.as_ref())),
                ["embed", id, ..] | ["shorts", id, ..] | ["live", id, ..] | ["v", id, ..] => youtube(*id),
                _ => None,
            }
        }
        "vimeo.com" | "player.vimeo.com" => segments
            .iter()
            .rev()
            .find(|seg| seg.chars().all(|c| c.is_ascii_digit()))
            .map(|id| VideoId {
                provider: VideoProvider::Vimeo,
                id: id.to_string(),
            }),
        _ => None,
    }
}

/// Thumbnail derived from a video URL's provider id
pub fn derived_video_thumbnail(raw: &str) -> Option<String> {
    video_id(raw)?.thumbnail_url()
}

/// Classify a pasted URL by host and extension
pub fn classify_url(raw: &str) -> MediaKind {
    let Some(url) = parse(raw) else {
        return MediaKind::Unknown;
    };

    if video_id(raw).is_some() {
        return MediaKind::VideoEmbed;
    }

    if let Some(ext) = extension_of(&url) {
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return MediaKind::Image;
        }
        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            return MediaKind::Document;
        }
    }

    if IMAGE_HOSTS.contains(&host_of(&url).as_str()) {
        return MediaKind::Image;
    }

    MediaKind::Link
}
