//! Configuration for cardnorm.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CARDNORM_HOME, CARDNORM_STORE,
//!    CARDNORM_ENRICH_TIMEOUT_MS, CARDNORM_ENRICH)
//! 2. Config file (.cardnorm/config.yaml)
//! 3. Defaults (~/.cardnorm)
//!
//! Config file discovery:
//! - Searches current directory and parents for .cardnorm/config.yaml
//! - `store` is relative to the project root (parent of .cardnorm/)
//! - `home` is relative to the .cardnorm/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::preview::DEFAULT_MAX_BODY_BYTES;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default enrichment timeout
pub const DEFAULT_ENRICH_TIMEOUT_MS: u64 = 3000;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub enrichment: Option<EnrichmentConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to .cardnorm/)
    pub home: Option<String>,
    /// Document store directory (relative to project root)
    pub store: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub enabled: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub max_body_bytes: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Absolute path to cardnorm home
    pub home: PathBuf,
    /// Directory holding one JSON file per document
    pub store: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Link-preview enrichment settings
    pub enrichment: EnrichmentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_ENRICH_TIMEOUT_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl EnrichmentSettings {
    fn from_file(config: Option<&EnrichmentConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };
        Self {
            enabled: config.enabled.unwrap_or(defaults.enabled),
            timeout_ms: config.timeout_ms.unwrap_or(defaults.timeout_ms),
            max_body_bytes: config.max_body_bytes.unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Environment overrides; unparseable values are ignored
    fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_var("CARDNORM_ENRICH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.timeout_ms = ms;
        }
        if let Some(enabled) = env_var("CARDNORM_ENRICH").and_then(|v| parse_bool(&v)) {
            self.enabled = enabled;
        }
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".cardnorm").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".cardnorm");

    let config_file = find_config_file();

    let (home, store, enrichment) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        let cardnorm_dir = config_path.parent().unwrap_or(Path::new("."));
        let base_dir = cardnorm_dir.parent().unwrap_or(Path::new("."));

        let home = if let Some(env_home) = env_var("CARDNORM_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            resolve_path(cardnorm_dir, home_path)
        } else {
            default_home
        };

        let store = if let Some(env_store) = env_var("CARDNORM_STORE") {
            PathBuf::from(env_store)
        } else if let Some(ref store_path) = config.paths.store {
            resolve_path(base_dir, store_path)
        } else {
            home.join("content")
        };

        (home, store, EnrichmentSettings::from_file(config.enrichment.as_ref()))
    } else {
        let home = env_var("CARDNORM_HOME")
            .map(PathBuf::from)
            .unwrap_or(default_home);

        let store = env_var("CARDNORM_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("content"));

        (home, store, EnrichmentSettings::default())
    };

    Ok(ResolvedConfig {
        home,
        store,
        config_file,
        enrichment: enrichment.with_env_overrides(),
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the document store directory.
pub fn store_dir() -> Result<PathBuf> {
    Ok(config()?.store.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let cardnorm_dir = temp.path().join(".cardnorm");
        std::fs::create_dir_all(&cardnorm_dir).unwrap();

        let config_path = cardnorm_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  store: ./content
enrichment:
  timeout_ms: 1500
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./".to_string()));
        assert_eq!(config.paths.store, Some("./content".to_string()));

        let enrichment = EnrichmentSettings::from_file(config.enrichment.as_ref());
        assert_eq!(enrichment.timeout_ms, 1500);
        assert!(enrichment.enabled);
        assert_eq!(enrichment.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_enrichment_defaults() {
        let settings = EnrichmentSettings::from_file(None);
        assert_eq!(settings, EnrichmentSettings::default());
        assert_eq!(settings.timeout_ms, 3000);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
