//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\book-enricher\config.toml
//! - macOS: ~/Library/Application Support/book-enricher/config.toml
//! - Linux: ~/.config/book-enricher/config.toml
//!
//! Every section is optional; missing keys take their defaults. API keys
//! can also come from `GOOGLE_BOOKS_API_KEY` / `NY_TIMES_API_KEY`, which
//! win over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::enrichment::cache::{CachePolicy, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::enrichment::http;

/// Provider key for Google Books in `providers.order`
pub const GOOGLE_BOOKS: &str = "google_books";
/// Provider key for Open Library in `providers.order`
pub const OPEN_LIBRARY: &str = "open_library";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub providers: ProvidersConfig,
    pub catalog: CatalogConfig,
}

/// Outbound HTTP settings shared by all providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for provider responses without a per-provider override
    pub default_ttl_secs: u64,
    /// TTL for whole enrichment results
    pub enrichment_ttl_secs: u64,
    pub max_entries: u64,
    /// Prepended to every cache key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL.as_secs(),
            enrichment_ttl_secs: DEFAULT_TTL.as_secs(),
            max_entries: DEFAULT_MAX_ENTRIES,
            key_prefix: String::new(),
        }
    }
}

impl CacheConfig {
    /// Policy for whole enrichment results.
    pub fn enrichment_policy(&self) -> CachePolicy {
        CachePolicy::new(Duration::from_secs(self.enrichment_ttl_secs))
    }
}

/// External provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Book data providers in priority order
    pub order: Vec<String>,
    pub google_books: ProviderConfig,
    pub open_library: ProviderConfig,
    pub nytimes: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: vec![GOOGLE_BOOKS.to_string(), OPEN_LIBRARY.to_string()],
            google_books: ProviderConfig::default(),
            open_library: ProviderConfig::default(),
            nytimes: ProviderConfig::default(),
        }
    }
}

/// Settings of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Overrides `cache.default_ttl_secs`
    pub cache_ttl_secs: Option<u64>,
    /// Remember "no result" for this long (off when unset)
    pub negative_ttl_secs: Option<u64>,
    /// Overrides the public API endpoint
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            cache_ttl_secs: None,
            negative_ttl_secs: None,
            base_url: None,
        }
    }
}

impl ProviderConfig {
    /// Cache policy for this provider's calls.
    pub fn cache_policy(&self, cache: &CacheConfig) -> CachePolicy {
        let ttl = Duration::from_secs(self.cache_ttl_secs.unwrap_or(cache.default_ttl_secs));
        let policy = CachePolicy::new(ttl);
        match self.negative_ttl_secs {
            Some(secs) => policy.with_negative_ttl(Duration::from_secs(secs)),
            None => policy,
        }
    }
}

/// Catalog database settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file (defaults to `book_enricher.db` in the working directory)
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Let API keys from the environment (or CLI) win over the file.
    pub fn apply_key_overrides(&mut self, google_books: Option<String>, nytimes: Option<String>) {
        if let Some(key) = google_books.filter(|k| !k.is_empty()) {
            self.providers.google_books.api_key = Some(key);
        }
        if let Some(key) = nytimes.filter(|k| !k.is_empty()) {
            self.providers.nytimes.api_key = Some(key);
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("book-enricher"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// Returns default config if the file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to a specific file.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
