//! Application configuration for imchef.
//!
//! User config lives at `~/.imchef/imchef.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ChefError, Result};
use crate::types::ChannelInfo;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "imchef.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".imchef";

/// One week, the lifetime of a cached API response.
const ONE_WEEK_SECS: u64 = 60 * 60 * 24 * 7;

// ---------------------------------------------------------------------------
// Config structs (matching imchef.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Content API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Channel metadata for the emitted tree.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Traversal and classification switches.
    #[serde(default)]
    pub content: ContentConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory the channel tree is written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "~/imchef-channels".into()
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoints are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://content.illustratemath.org/api/v1".into()
}
fn default_api_key_env() -> String {
    "ILLUSTRATIVE_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Serve repeated requests from the local response cache.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database path. Defaults to `~/.imchef/cache/http_cache.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Age after which a cached response is refetched.
    #[serde(default = "default_expire_after")]
    pub expire_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            expire_after_secs: default_expire_after(),
        }
    }
}

impl CacheConfig {
    /// Configured database path, or the default under the config directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(p) => Ok(expand_home(p)),
            None => Ok(config_dir()?.join("cache").join("http_cache.db")),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_expire_after() -> u64 {
    ONE_WEEK_SECS
}

/// `[channel]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_domain")]
    pub domain: String,
    #[serde(default = "default_channel_source_id")]
    pub source_id: String,
    #[serde(default = "default_channel_title")]
    pub title: String,
    #[serde(default = "default_channel_language")]
    pub language: String,
    #[serde(default = "default_channel_description")]
    pub description: String,
    #[serde(default = "default_channel_tagline")]
    pub tagline: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            domain: default_channel_domain(),
            source_id: default_channel_source_id(),
            title: default_channel_title(),
            language: default_channel_language(),
            description: default_channel_description(),
            tagline: default_channel_tagline(),
        }
    }
}

fn default_channel_domain() -> String {
    "https://content.illustratemath.org/api/v1/".into()
}
fn default_channel_source_id() -> String {
    "illustrativemathematics".into()
}
fn default_channel_title() -> String {
    "US Common Core PBL Mathematics".into()
}
fn default_channel_language() -> String {
    "en".into()
}
fn default_channel_description() -> String {
    "Project Based Learning for Mathematics, aligned to the US Common Core curriculum standards."
        .into()
}
fn default_channel_tagline() -> String {
    "Learn Mathematics through engaging hands on activities facilitated by a teacher.".into()
}

impl From<&ChannelConfig> for ChannelInfo {
    fn from(c: &ChannelConfig) -> Self {
        Self {
            source_domain: c.domain.clone(),
            source_id: c.source_id.clone(),
            title: c.title.clone(),
            language: c.language.clone(),
            description: c.description.clone(),
            tagline: c.tagline.clone(),
        }
    }
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Curriculums in any other locale are skipped.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Walk unit assessments (fetch only; no nodes are produced).
    #[serde(default)]
    pub assessments: bool,

    /// Import practice problems for K5 sections.
    #[serde(default)]
    pub practice_problems: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            assessments: false,
            practice_problems: false,
        }
    }
}

fn default_locale() -> String {
    "en".into()
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one chef run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// API base URL (no trailing slash).
    pub base_url: Url,
    /// Value sent in the `api-key` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Response cache database, `None` when caching is disabled.
    pub cache_path: Option<PathBuf>,
    /// Maximum age of a cached response.
    pub cache_expire_after: Duration,
    /// Root channel metadata.
    pub channel: ChannelInfo,
    /// Target curriculum locale.
    pub locale: String,
    /// Walk unit assessments.
    pub assessments: bool,
    /// Import K5 practice problems.
    pub practice_problems: bool,
    /// Directory the channel tree is written into.
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// Merge the file config with a resolved API key.
    pub fn new(config: &AppConfig, api_key: String) -> Result<Self> {
        let base = config.api.base_url.trim_end_matches('/');
        let base_url = Url::parse(base)
            .map_err(|e| ChefError::config(format!("invalid api.base_url '{base}': {e}")))?;

        let cache_path = if config.cache.enabled {
            Some(config.cache.resolved_path()?)
        } else {
            None
        };

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(config.api.timeout_secs),
            cache_path,
            cache_expire_after: Duration::from_secs(config.cache.expire_after_secs),
            channel: ChannelInfo::from(&config.channel),
            locale: config.content.locale.clone(),
            assessments: config.content.assessments,
            practice_problems: config.content.practice_problems,
            output_dir: expand_home(&config.defaults.output_dir),
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.imchef/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ChefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.imchef/imchef.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChefError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ChefError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| ChefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in `[api].api_key_env`.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ChefError::config(format!(
            "content API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("ILLUSTRATIVE_API_KEY"));
        assert!(toml_str.contains("illustrativemathematics"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.cache.expire_after_secs, ONE_WEEK_SECS);
        assert_eq!(parsed.content.locale, "en");
        assert!(!parsed.content.assessments);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[api]
base_url = "http://127.0.0.1:9000/api/v1/"

[content]
locale = "es"
practice_problems = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.api_key_env, "ILLUSTRATIVE_API_KEY");
        assert_eq!(config.content.locale, "es");
        assert!(config.content.practice_problems);
        assert_eq!(config.channel.title, "US Common Core PBL Mathematics");
    }

    #[test]
    fn run_config_strips_trailing_slash_and_disables_cache() {
        let mut app = AppConfig::default();
        app.api.base_url = "http://127.0.0.1:9000/api/v1/".into();
        app.cache.enabled = false;
        app.defaults.output_dir = "/tmp/imchef-out".into();

        let run = RunConfig::new(&app, "secret".into()).expect("run config");
        assert_eq!(run.base_url.as_str(), "http://127.0.0.1:9000/api/v1");
        assert!(run.cache_path.is_none());
        assert_eq!(run.output_dir, PathBuf::from("/tmp/imchef-out"));
        assert_eq!(run.channel.source_id, "illustrativemathematics");
        assert_eq!(run.timeout, Duration::from_secs(30));
    }

    #[test]
    fn run_config_rejects_bad_base_url() {
        let mut app = AppConfig::default();
        app.api.base_url = "not a url".into();
        let err = RunConfig::new(&app, "k".into()).unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn cache_path_override_is_used() {
        let mut app = AppConfig::default();
        app.cache.path = Some("/tmp/imchef-cache/test.db".into());
        assert_eq!(
            app.cache.resolved_path().unwrap(),
            PathBuf::from("/tmp/imchef-cache/test.db")
        );
        let run = RunConfig::new(&app, "k".into()).unwrap();
        assert_eq!(run.cache_path, Some(PathBuf::from("/tmp/imchef-cache/test.db")));
    }

    #[test]
    fn api_key_resolution() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api.api_key_env = "IMCHEF_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
