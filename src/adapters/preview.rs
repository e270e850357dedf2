//! HTTP link-preview adapter.
//!
//! Fetches a page and reads Open Graph / Twitter card tags, falling back to
//! `<title>` and `<meta name="description">`.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::domain::{MetadataSource, PreviewMetadata};

use super::{EnrichmentError, PreviewFetcher};

/// Default cap on how much of a page body is read (512KB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 512 * 1024;

/// Default user agent sent with preview requests
pub const DEFAULT_USER_AGENT: &str = concat!("cardnorm/", env!("CARGO_PKG_VERSION"));

static META_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("meta tag regex"));
static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute regex")
});
static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Settings for [`HttpPreviewFetcher`]
#[derive(Debug, Clone)]
pub struct PreviewFetcherConfig {
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for PreviewFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Preview fetcher backed by `reqwest`
pub struct HttpPreviewFetcher {
    client: reqwest::Client,
    config: PreviewFetcherConfig,
}

impl Default for HttpPreviewFetcher {
    fn default() -> Self {
        Self::new(PreviewFetcherConfig::default())
    }
}

impl HttpPreviewFetcher {
    pub fn new(config: PreviewFetcherConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String, EnrichmentError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        if !content_type.contains("html") {
            return Err(EnrichmentError::NotHtml(content_type));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(e, timeout))?
        {
            body.extend_from_slice(&chunk);
            if body.len() >= self.config.max_body_bytes {
                body.truncate(self.config.max_body_bytes);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn request_error(error: reqwest::Error, timeout: Duration) -> EnrichmentError {
    if error.is_timeout() {
        EnrichmentError::Timeout(timeout)
    } else {
        EnrichmentError::Request(error.to_string())
    }
}

#[async_trait]
impl PreviewFetcher for HttpPreviewFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_preview_metadata(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<PreviewMetadata, EnrichmentError> {
        debug!(%url, "fetching preview metadata");
        let html = self.fetch_html(url, timeout).await?;
        extract_preview(url, &html).ok_or(EnrichmentError::NoMetadata)
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn clean_text(text: &str) -> Option<String> {
    let decoded = decode_entities(text);
    let collapsed = WHITESPACE_REGEX.replace_all(decoded.trim(), " ").to_string();
    (!collapsed.is_empty()).then_some(collapsed)
}

/// `property`/`name` -> `content` for every `<meta>` tag; first one wins
fn meta_tags(html: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for tag in META_TAG_REGEX.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for caps in ATTRIBUTE_REGEX.captures_iter(tag.as_str()) {
            let name = caps[1].to_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match (name.as_str(), value) {
                ("property" | "name", Some(v)) => key = Some(v.to_lowercase()),
                ("content", Some(v)) => content = Some(v.to_string()),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            tags.entry(key).or_insert(content);
        }
    }
    tags
}

/// Pull preview metadata out of an HTML page. `None` if nothing useful is there.
pub fn extract_preview(page_url: &str, html: &str) -> Option<PreviewMetadata> {
    let tags = meta_tags(html);
    let first = |keys: &[&str]| keys.iter().find_map(|k| tags.get(*k).and_then(|v| clean_text(v)));

    let title = first(&["og:title", "twitter:title"]).or_else(|| {
        TITLE_REGEX
            .captures(html)
            .and_then(|caps| clean_text(&caps[1]))
    });
    let description = first(&["og:description", "twitter:description", "description"]);
    let site_name = first(&["og:site_name", "application-name"]);
    let image_url = first(&["og:image", "og:image:url", "twitter:image"]).map(|image| {
        Url::parse(page_url)
            .and_then(|base| base.join(&image))
            .map(|u| u.to_string())
            .unwrap_or(image)
    });

    let metadata = PreviewMetadata {
        url: page_url.to_string(),
        title,
        description,
        image_url,
        site_name,
        source: MetadataSource::Provider,
    };

    metadata.has_details().then_some(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_open_graph() {
        let html = r#"
            <html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="The &amp; Story">
            <meta content="A short description" property="og:description" />
            <meta property='og:image' content='/img/cover.jpg'>
            <meta property="og:site_name" content="Example">
            </head></html>
        "#;

        let meta = extract_preview("https://example.com/news/1", html).unwrap();

        assert_eq!(meta.title.as_deref(), Some("The & Story"));
        assert_eq!(meta.description.as_deref(), Some("A short description"));
        assert_eq!(meta.image_url.as_deref(), Some("https://example.com/img/cover.jpg"));
        assert_eq!(meta.site_name.as_deref(), Some("Example"));
        assert_eq!(meta.source, MetadataSource::Provider);
    }

    #[test]
    fn test_extract_falls_back_to_title_and_description() {
        let html = r#"<title>
            Plain   page
        </title><meta name="description" content="Described">"#;

        let meta = extract_preview("https://example.com", html).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Plain page"));
        assert_eq!(meta.description.as_deref(), Some("Described"));
        assert_eq!(meta.image_url, None);
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_preview("https://example.com", "<html><body>hi</body></html>").is_none());
    }

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpPreviewFetcher::default();
        assert_eq!(fetcher.name(), "http");
        assert_eq!(fetcher.config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }
}
