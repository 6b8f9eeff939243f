//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - [`DataDir`]: a temporary data directory laid out as `<vendor>/index.json`
//! - [`MockPlugin`]: a scriptable [`DocPlugin`] with configurable hits, delay and failures
//! - [`CountingFetcher`]: a [`PageFetcher`] that counts network calls
//! - [`loaded_registry`]: a registry with the REV and WPILib corpora loaded

// Each integration test crate uses a different subset of these helpers
#![allow(dead_code)]

use frc_docs_mcp::plugins::catalog;
use frc_docs_mcp::{
    Config, DocPlugin, DocSection, FetchError, FetchedPage, IndexStats, PageContent, PageFetcher,
    PluginConfig, PluginDescriptor, PluginError, PluginRegistry, SearchResult,
};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const REV_INDEX: &str = r#"{
    "vendor": "rev",
    "version": "2025",
    "built_at": "2025-01-04T12:00:00Z",
    "pages": [
        {"url": "https://docs.revrobotics.com/brushless/spark-max/current-limit", "title": "SparkMax Current Limit",
         "section": "Motor Controllers", "language": "Java",
         "content": "Set the smart current limit on the SparkMax to protect the motor. The current limit is configured in amps."},
        {"url": "https://docs.revrobotics.com/brushless/spark-flex/current-limit", "title": "SparkFlex Current Limit",
         "section": "Motor Controllers", "language": "C++",
         "content": "Configure a current limit for the SparkFlex from C++ code."},
        {"url": "https://docs.revrobotics.com/brushless/spark-max/closed-loop", "title": "Closed Loop Control",
         "section": "Motor Controllers", "language": "Java",
         "content": "PID closed loop control on the SparkMax with current feedback."},
        {"url": "https://docs.revrobotics.com/sensors/through-bore", "title": "Through Bore Encoder",
         "section": "Sensors", "language": "Java",
         "content": "Wiring the absolute encoder. Current draw is below one amp, no limit needed."},
        {"url": "https://docs.revrobotics.com/software/hardware-client", "title": "REV Hardware Client",
         "section": "Software", "language": "Python",
         "content": "Update firmware and check the current limit setting with the hardware client."}
    ]
}"#;

pub const WPILIB_INDEX: &str = r#"{
    "vendor": "wpilib",
    "version": "2025",
    "pages": [
        {"url": "https://docs.wpilib.org/en/stable/docs/software/hardware-apis/motors/current-limits.html",
         "title": "Motor Current Limits", "section": "Hardware APIs", "language": "Java",
         "content": "Current limits keep breakers from tripping. Use a current limit on every drivetrain motor."},
        {"url": "https://docs.wpilib.org/en/stable/docs/software/advanced-controls/pid.html",
         "title": "PID Control", "section": "Advanced Controls", "language": "Python",
         "content": "Tuning a PID controller with proportional, integral and derivative gains."},
        {"url": "https://docs.wpilib.org/en/stable/docs/zero-to-robot/introduction.html",
         "title": "Zero to Robot", "section": "Getting Started",
         "content": "Step by step guide to programming your first robot."}
    ]
}"#;

/// A temporary data directory holding vendor index files.
pub struct DataDir {
    _temp: TempDir,
    root: PathBuf,
}

impl DataDir {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path at which `vendor`'s index is expected.
    pub fn index_path(&self, vendor: &str) -> PathBuf {
        self.root.join(vendor).join("index.json")
    }

    /// Write (or overwrite) `vendor`'s index.
    pub fn write_index(&self, vendor: &str, content: &str) -> PathBuf {
        let path = self.index_path(vendor);
        std::fs::create_dir_all(path.parent().unwrap())
            .unwrap_or_else(|e| panic!("Failed to create directory for '{}': {}", vendor, e));
        std::fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Failed to write index for '{}': {}", vendor, e));
        path
    }

    /// Configuration rooted at this directory with default settings.
    pub fn config(&self) -> Config {
        Config {
            data_dir: self.root.clone(),
            ..Config::default()
        }
    }
}

/// Plugin configuration reading the index at `path`.
pub fn plugin_config(path: &Path) -> PluginConfig {
    PluginConfig {
        enabled: true,
        versions: vec![],
        languages: vec![],
        ttl_seconds: 3600,
        fetch_timeout: Duration::from_secs(5),
        index_path: path.to_path_buf(),
    }
}

/// A page fetcher that serves a fixed body and counts how often it is hit.
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingFetcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageFetcher for CountingFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedPage, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if url.contains("missing") {
                return Err(FetchError::PageNotFound {
                    url: url.to_string(),
                });
            }
            Ok(FetchedPage {
                url: url.to_string(),
                title: Some("Fetched Title".to_string()),
                text: format!("Body of {}", url),
                fetched_at: SystemTime::now(),
            })
        })
    }
}

/// A scriptable plugin for coordinator and registry tests.
pub struct MockPlugin {
    descriptor: PluginDescriptor,
    hits: Vec<SearchResult>,
    delay: Option<Duration>,
    search_failure: bool,
    panics: bool,
    init_failure: Option<String>,
    searches: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl MockPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: PluginDescriptor {
                name: name.to_string(),
                display_name: name.to_uppercase(),
                description: format!("{} test corpus", name),
                supported_versions: vec!["2025".to_string()],
                supported_languages: vec!["Java".to_string()],
                base_urls: vec![format!("https://{}.example.com", name)],
            },
            hits: Vec::new(),
            delay: None,
            search_failure: false,
            panics: false,
            init_failure: None,
            searches: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Add a hit at `<base>/<path>` with `score`.
    pub fn with_hit(mut self, path: &str, score: f64) -> Self {
        let url = format!("{}/{}", self.descriptor.base_urls[0], path);
        self.hits.push(hit(&url, &self.descriptor.display_name, score));
        self
    }

    /// Add a hit at an arbitrary URL.
    pub fn with_url_hit(mut self, url: &str, score: f64) -> Self {
        self.hits.push(hit(url, &self.descriptor.display_name, score));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.search_failure = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn failing_init(mut self, reason: &str) -> Self {
        self.init_failure = Some(reason.to_string());
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub async fn register(self, registry: &PluginRegistry) -> Arc<Self> {
        let plugin = Arc::new(self);
        let _ = registry
            .register(plugin.clone(), plugin_config(Path::new("/unused")))
            .await;
        plugin
    }
}

fn hit(url: &str, vendor: &str, score: f64) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        title: format!("Page {}", url.rsplit('/').next().unwrap_or(url)),
        section: "General".to_string(),
        language: "Java".to_string(),
        version: "2025".to_string(),
        vendor: vendor.to_string(),
        score,
        preview_text: String::new(),
    }
}

impl DocPlugin for MockPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn initialize<'a>(
        &'a self,
        _config: &'a PluginConfig,
    ) -> BoxFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            match &self.init_failure {
                Some(reason) => Err(PluginError::Init {
                    plugin: self.descriptor.name.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(()),
            }
        })
    }

    fn search<'a>(
        &'a self,
        _query: &'a str,
        _version: Option<&'a str>,
        _language: Option<&'a str>,
        max_results: usize,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, PluginError>> {
        Box::pin(async move {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            assert!(!self.panics, "mock plugin {} panicked", self.descriptor.name);
            if self.search_failure {
                return Err(PluginError::NotInitialized {
                    plugin: self.descriptor.name.clone(),
                });
            }
            Ok(self.hits.iter().take(max_results).cloned().collect())
        })
    }

    fn fetch_page<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PageContent, FetchError>> {
        Box::pin(async move {
            Ok(PageContent {
                url: url.to_string(),
                title: "Mock Page".to_string(),
                text: format!("Content of {}", url),
                vendor: self.descriptor.display_name.clone(),
                language: None,
                version: None,
                section: None,
                fetched_at: SystemTime::now(),
            })
        })
    }

    fn list_sections<'a>(
        &'a self,
        _version: Option<&'a str>,
        _language: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<DocSection>, PluginError>> {
        Box::pin(async move {
            if self.search_failure {
                return Err(PluginError::NotInitialized {
                    plugin: self.descriptor.name.clone(),
                });
            }
            Ok(vec![DocSection {
                name: "General".to_string(),
                vendor: self.descriptor.name.clone(),
                page_count: self.hits.len(),
            }])
        })
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn index_stats(&self) -> BoxFuture<'_, Option<IndexStats>> {
        Box::pin(async move { None })
    }
}

/// A registry over REV and WPILib fixture corpora, plus the data directory and fetcher behind it.
pub struct LoadedRegistry {
    pub registry: Arc<PluginRegistry>,
    pub fetcher: Arc<CountingFetcher>,
    pub data: DataDir,
}

pub async fn loaded_registry() -> LoadedRegistry {
    let data = DataDir::new();
    data.write_index("rev", REV_INDEX);
    data.write_index("wpilib", WPILIB_INDEX);

    let fetcher = Arc::new(CountingFetcher::default());
    let registry = Arc::new(PluginRegistry::from_config(&data.config(), fetcher.clone()).await);
    LoadedRegistry {
        registry,
        fetcher,
        data,
    }
}

/// Display name the catalog gives `vendor`.
pub fn display_name(vendor: &str) -> String {
    catalog::descriptor(vendor)
        .map(|d| d.display_name)
        .unwrap_or_default()
}
