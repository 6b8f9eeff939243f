//! Server configuration: file discovery, parsing and per-plugin resolution.

use crate::plugins::catalog;
use crate::types::{MAX_RESULTS_RANGE, PluginDescriptor};
use anyhow::{Context, ensure};
use reqwest::Url;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "FRC_DOCS_MCP_CONFIG";

const APP_DIR: &str = "frc-docs-mcp";
const INDEX_FILE: &str = "index.json";

/// Top-level configuration, read from `config.toml` or `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root under which `<plugin>/index.json` files live
    pub data_dir: PathBuf,
    /// Poll interval for the index reload watcher; disabled when absent
    pub reload_interval_secs: Option<u64>,
    pub plugins: BTreeMap<String, PluginSettings>,
    pub cache: CacheSettings,
    pub search: SearchSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reload_interval_secs: None,
            plugins: BTreeMap::new(),
            cache: CacheSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

/// Raw settings for one plugin as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub enabled: bool,
    pub versions: Vec<String>,
    pub languages: Vec<String>,
    pub index_path: Option<PathBuf>,
    pub ttl_seconds: Option<u64>,
    // Only needed for vendors outside the built-in catalog
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub base_urls: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            versions: Vec::new(),
            languages: Vec::new(),
            index_path: None,
            ttl_seconds: None,
            display_name: None,
            description: None,
            base_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_max_results: usize,
    pub default_version: Option<String>,
    pub default_language: Option<String>,
    /// Fan-out deadline per query
    pub deadline_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_max_results: 10,
            default_version: None,
            default_language: None,
            deadline_ms: 5000,
        }
    }
}

/// Validated per-plugin configuration handed to `DocPlugin::initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub enabled: bool,
    pub versions: Vec<String>,
    pub languages: Vec<String>,
    pub ttl_seconds: u64,
    pub fetch_timeout: Duration,
    pub index_path: PathBuf,
}

impl PluginConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// Lookup order: `explicit`, then `$FRC_DOCS_MCP_CONFIG`, then
    /// `<config_dir>/frc-docs-mcp/config.{toml,json}`.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let candidates: Vec<PathBuf> = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => vec![path],
            None => default_config_paths(),
        };

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::from_file(path),
            None => {
                tracing::warn!(
                    "No configuration file found (tried {}), using defaults",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                Ok(Self::default())
            }
        }
    }

    /// Parse a configuration file; `.toml` files are TOML, anything else JSON.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
        .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        config.finish()
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(text).context("Failed to parse JSON")?;
        config.finish()
    }

    fn finish(mut self) -> crate::Result<Self> {
        self.data_dir = expand_path(&self.data_dir);
        for settings in self.plugins.values_mut() {
            if let Some(path) = &settings.index_path {
                settings.index_path = Some(expand_path(path));
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> crate::Result<()> {
        ensure!(
            MAX_RESULTS_RANGE.contains(&self.search.default_max_results),
            "search.default_max_results must be between {} and {}",
            MAX_RESULTS_RANGE.start(),
            MAX_RESULTS_RANGE.end()
        );
        ensure!(self.search.deadline_ms > 0, "search.deadline_ms must be positive");
        ensure!(
            self.cache.fetch_timeout_secs > 0,
            "cache.fetch_timeout_secs must be positive"
        );
        for (name, settings) in &self.plugins {
            ensure!(
                !name.trim().is_empty() && name.to_lowercase() == *name,
                "plugin name '{}' must be non-empty and lowercase",
                name
            );
            if catalog::descriptor(name).is_none() && settings.enabled {
                ensure!(
                    !settings.base_urls.is_empty(),
                    "plugin '{}' is not a built-in vendor and needs base_urls",
                    name
                );
            }
            for base in &settings.base_urls {
                ensure!(
                    Url::parse(base).is_ok_and(|url| url.host_str().is_some()),
                    "plugin '{}' has an invalid base URL '{}'",
                    name,
                    base
                );
            }
        }
        Ok(())
    }

    /// Every plugin to instantiate: built-in vendors in catalog order, then
    /// additional configured vendors alphabetically.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = catalog::BUILTIN_NAMES
            .iter()
            .map(|name| (*name).to_string())
            .collect();
        names.extend(
            self.plugins
                .keys()
                .filter(|name| catalog::descriptor(name).is_none())
                .cloned(),
        );
        names
    }

    pub fn plugin_settings(&self, name: &str) -> Cow<'_, PluginSettings> {
        self.plugins
            .get(name)
            .map_or_else(|| Cow::Owned(PluginSettings::default()), Cow::Borrowed)
    }

    /// Descriptor for `name` with configured version/language overrides applied.
    ///
    /// `None` when the vendor is neither built in nor fully declared in config.
    pub fn descriptor(&self, name: &str) -> Option<PluginDescriptor> {
        let settings = self.plugin_settings(name);
        let mut descriptor = match catalog::descriptor(name) {
            Some(descriptor) => descriptor,
            None if !settings.base_urls.is_empty() => PluginDescriptor {
                name: name.to_string(),
                display_name: settings
                    .display_name
                    .clone()
                    .unwrap_or_else(|| name.to_string()),
                description: settings.description.clone().unwrap_or_default(),
                supported_versions: Vec::new(),
                supported_languages: Vec::new(),
                base_urls: settings.base_urls.clone(),
            },
            None => return None,
        };

        if !settings.versions.is_empty() {
            descriptor.supported_versions.clone_from(&settings.versions);
        }
        if !settings.languages.is_empty() {
            descriptor
                .supported_languages
                .clone_from(&settings.languages);
        }
        Some(descriptor)
    }

    /// Resolve the validated configuration for one plugin.
    pub fn plugin_config(&self, name: &str) -> PluginConfig {
        let settings = self.plugin_settings(name);
        PluginConfig {
            enabled: settings.enabled,
            versions: settings.versions.clone(),
            languages: settings.languages.clone(),
            ttl_seconds: settings.ttl_seconds.unwrap_or(self.cache.ttl_seconds),
            fetch_timeout: Duration::from_secs(self.cache.fetch_timeout_secs),
            index_path: settings
                .index_path
                .clone()
                .unwrap_or_else(|| self.data_dir.join(name).join(INDEX_FILE)),
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.search.deadline_ms)
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        self.reload_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_config_paths() -> Vec<PathBuf> {
    dirs::config_dir()
        .map(|dir| {
            let dir = dir.join(APP_DIR);
            vec![dir.join("config.toml"), dir.join("config.json")]
        })
        .unwrap_or_default()
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match expand_tilde(&raw) {
        Cow::Borrowed(_) => path.to_path_buf(),
        Cow::Owned(expanded) => PathBuf::from(expanded),
    }
}

/// Expands tilde (`~`) in a path to the user's home directory.
///
/// - `~/foo` becomes `/home/user/foo`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
///
/// Returns `Cow::Borrowed` if no expansion needed, `Cow::Owned` if expanded.
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}
