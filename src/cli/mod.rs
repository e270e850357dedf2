//! Command-line interface for cardnorm.
//!
//! Reads `RawSubmission` JSON, runs it through the normalizer and prints
//! JSON results on stdout. Diagnostics and logs go to stderr.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::adapters::{DisabledPreviewFetcher, HttpPreviewFetcher, PreviewFetcher, PreviewFetcherConfig};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    classify_url, collect_all_image_urls, derived_video_thumbnail, resolve_thumbnail, video_id,
    ContentNormalizer, NormalizerSettings,
};
use crate::domain::{ContentId, Diagnostic, RawSubmission};
use crate::library::{ContentStore, FileContentStore};

/// cardnorm - Content normalization and media classification
#[derive(Parser, Debug)]
#[command(name = "cardnorm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a new submission and store it
    Create {
        /// Submission JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the normalized record without storing it
        #[arg(long)]
        dry_run: bool,

        /// Skip link-preview enrichment
        #[arg(long)]
        no_enrich: bool,
    },

    /// Merge an edit submission into a stored record
    Edit {
        /// Content ID
        content_id: String,

        /// Submission JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the update payload without applying it
        #[arg(long)]
        dry_run: bool,

        /// Skip link-preview enrichment
        #[arg(long)]
        no_enrich: bool,
    },

    /// Show a stored record with its resolved thumbnail and images
    Show {
        /// Content ID
        content_id: String,
    },

    /// Show how a URL would be classified
    InspectUrl {
        /// URL to inspect
        url: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Create {
                input,
                dry_run,
                no_enrich,
            } => create_content(input, dry_run, no_enrich).await,
            Commands::Edit {
                content_id,
                input,
                dry_run,
                no_enrich,
            } => edit_content(&content_id, input, dry_run, no_enrich).await,
            Commands::Show { content_id } => show_content(&content_id).await,
            Commands::InspectUrl { url } => inspect_url(&url),
            Commands::Config => show_config(),
        }
    }
}

/// Read and parse a submission from a file or piped stdin
fn read_submission(input_file: Option<PathBuf>) -> Result<RawSubmission> {
    let input = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    if input.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }

    serde_json::from_str(&input).context("Failed to parse submission JSON")
}

fn build_normalizer(
    cfg: &ResolvedConfig,
    store: Arc<dyn ContentStore>,
    no_enrich: bool,
) -> ContentNormalizer {
    let mut settings = NormalizerSettings::from_config(cfg);
    if no_enrich {
        settings.enrich = false;
    }

    let fetcher: Arc<dyn PreviewFetcher> = if settings.enrich {
        Arc::new(HttpPreviewFetcher::new(PreviewFetcherConfig {
            max_body_bytes: cfg.enrichment.max_body_bytes,
            ..Default::default()
        }))
    } else {
        Arc::new(DisabledPreviewFetcher)
    };

    ContentNormalizer::new(fetcher, store, settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        eprintln!("[{}] {}", diagnostic.code, diagnostic.detail);
    }
}

/// Normalize and store a new submission
async fn create_content(input: Option<PathBuf>, dry_run: bool, no_enrich: bool) -> Result<()> {
    let cfg = config::config()?;
    let submission = read_submission(input)?;

    let store = Arc::new(FileContentStore::new(cfg.store.clone()));
    let normalizer = build_normalizer(cfg, store.clone(), no_enrich);

    let normalized = normalizer.normalize_for_create(submission).await?;
    report_diagnostics(normalized.diagnostics.iter());

    if dry_run {
        return print_json(&normalized.value);
    }

    let document = store.insert(normalized.value).await?;
    eprintln!("[Stored {} at {}]", document.id, store.document_path(&document.id)?.display());
    print_json(&document)
}

/// Merge an edit into a stored record
async fn edit_content(
    content_id: &str,
    input: Option<PathBuf>,
    dry_run: bool,
    no_enrich: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let id: ContentId = content_id.parse()?;
    let submission = read_submission(input)?;

    let store = Arc::new(FileContentStore::new(cfg.store.clone()));
    let normalizer = build_normalizer(cfg, store.clone(), no_enrich);

    let normalized = normalizer.normalize_for_edit(submission, &id).await?;
    report_diagnostics(normalized.diagnostics.iter());

    if dry_run {
        return print_json(&normalized.value);
    }

    if normalized.value.is_empty() {
        eprintln!("[No changes for {}]", id);
        return Ok(());
    }

    let document = store.apply_update(&id, &normalized.value).await?;
    print_json(&document)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    document: &'a crate::domain::PersistedDocument,
    thumbnail: Option<String>,
    all_image_urls: Vec<String>,
    display_title: Option<&'a str>,
}

/// Show a stored record
async fn show_content(content_id: &str) -> Result<()> {
    let id: ContentId = content_id.parse()?;
    let store = FileContentStore::from_config()?;

    let document = store
        .load_existing_content(&id)
        .await?
        .with_context(|| format!("Content not found: {}", id))?;

    print_json(&ShowOutput {
        thumbnail: resolve_thumbnail(&document),
        all_image_urls: collect_all_image_urls(&document),
        display_title: document.content.display_title(),
        document: &document,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlReport {
    url: String,
    kind: crate::domain::MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
}

/// Show how a URL is classified
fn inspect_url(url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("URL is empty");
    }

    print_json(&UrlReport {
        url: url.to_string(),
        kind: classify_url(url),
        video_id: video_id(url).map(|v| v.id),
        thumbnail: derived_video_thumbnail(url),
    })
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("cardnorm configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:  {}", cfg.home.display());
    println!("  Store: {}", cfg.store.display());
    println!();
    println!("Enrichment:");
    println!("  Enabled:        {}", cfg.enrichment.enabled);
    println!("  Timeout:        {}ms", cfg.enrichment.timeout_ms);
    println!("  Max body size:  {} bytes", cfg.enrichment.max_body_bytes);

    Ok(())
}
