//! Process-wide ownership of plugin instances.
//!
//! The registry is built once at startup, injected into the coordinator and the
//! server, and torn down explicitly with [`PluginRegistry::shutdown`].

use super::{DocPlugin, IndexStats, VendorPlugin};
use crate::config::{Config, PluginConfig};
use crate::error::{FetchError, PluginError, RequestError};
use crate::fetch::PageFetcher;
use crate::types::{PluginDescriptor, VendorFilter};
use rapidfuzz::distance::jaro_winkler;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Minimum Jaro-Winkler similarity for a vendor name suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;
const MAX_SUGGESTIONS: usize = 3;

/// Whether a registered plugin takes part in searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PluginState {
    Enabled,
    Disabled { reason: String },
}

/// Snapshot of one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub descriptor: PluginDescriptor,
    pub state: PluginState,
    pub index: Option<IndexStats>,
}

/// Result of re-reading one plugin's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new index was swapped in
    Reloaded,
    /// The index file had not changed
    Unchanged,
    /// A previously disabled plugin loaded successfully and now serves queries
    Enabled,
}

#[derive(Clone)]
struct Entry {
    plugin: Arc<dyn DocPlugin>,
    config: PluginConfig,
    /// Why the plugin is disabled, if it is
    failure: Option<String>,
}

impl Entry {
    fn is_enabled(&self) -> bool {
        self.failure.is_none()
    }
}

/// Owns every configured plugin, enabled or not.
///
/// The map is read-mostly; index swaps happen inside each plugin, so readers
/// holding an `Arc<dyn DocPlugin>` never observe a half-built index.
pub struct PluginRegistry {
    entries: RwLock<BTreeMap<String, Entry>>,
    cancel: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "plugins",
                &self
                    .entries
                    .try_read()
                    .map(|entries| entries.keys().cloned().collect::<Vec<_>>())
                    .ok(),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            cancel: CancellationToken::new(),
            watcher: Mutex::new(None),
        }
    }

    /// Instantiate and initialize every enabled plugin named by `config`.
    ///
    /// Plugins that fail to initialize are kept as disabled; startup continues.
    pub async fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        let registry = Self::new();

        for name in config.plugin_names() {
            let plugin_config = config.plugin_config(&name);
            if !plugin_config.enabled {
                tracing::info!("Plugin {} is disabled by configuration, skipping", name);
                continue;
            }
            let Some(descriptor) = config.descriptor(&name) else {
                tracing::warn!("Plugin {} has no descriptor, skipping", name);
                continue;
            };

            let plugin = Arc::new(VendorPlugin::new(descriptor, Arc::clone(&fetcher)));
            // Failures are recorded on the entry and logged by `register`
            let _ = registry.register(plugin, plugin_config).await;
        }

        let enabled = registry.enabled_names().await;
        tracing::info!(
            "{} plugin(s) enabled: {}",
            enabled.len(),
            enabled.join(", ")
        );
        registry
    }

    /// Initialize `plugin` and add it under its descriptor name.
    ///
    /// A failed initialization leaves the plugin registered but disabled.
    /// Returns the initialization result for the caller's information.
    pub async fn register(
        &self,
        plugin: Arc<dyn DocPlugin>,
        config: PluginConfig,
    ) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        let result = plugin.initialize(&config).await;

        let failure = match &result {
            Ok(()) => {
                tracing::info!("Initialized plugin {} ({})", name, plugin.descriptor().display_name);
                None
            }
            Err(e) => {
                tracing::warn!("Disabling plugin {}: {}", name, e);
                Some(e.to_string())
            }
        };

        let previous = self.entries.write().await.insert(
            name.clone(),
            Entry {
                plugin,
                config,
                failure,
            },
        );
        if let Some(previous) = previous {
            tracing::warn!("Plugin {} registered twice, replacing the earlier instance", name);
            previous.plugin.shutdown().await;
        }

        result
    }

    /// Enabled plugin by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn DocPlugin>> {
        self.entries
            .read()
            .await
            .get(name)
            .filter(|entry| entry.is_enabled())
            .map(|entry| Arc::clone(&entry.plugin))
    }

    /// All enabled plugins, in name order.
    pub async fn active(&self) -> Vec<Arc<dyn DocPlugin>> {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_enabled())
            .map(|entry| Arc::clone(&entry.plugin))
            .collect()
    }

    pub async fn enabled_names(&self) -> Vec<String> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_enabled())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Resolve a vendor filter to enabled plugins, in name order.
    ///
    /// Unknown names are ignored with a warning. When every requested name is
    /// unknown the request fails with suggestions for the closest vendors.
    pub async fn select(
        &self,
        filter: &VendorFilter,
    ) -> Result<Vec<Arc<dyn DocPlugin>>, RequestError> {
        let VendorFilter::Only(requested) = filter else {
            return Ok(self.active().await);
        };

        let entries = self.entries.read().await;
        let unknown: Vec<String> = requested
            .iter()
            .filter(|name| !entries.contains_key(name.as_str()))
            .cloned()
            .collect();

        if unknown.len() == requested.len() {
            let known: Vec<&str> = entries.keys().map(String::as_str).collect();
            return Err(RequestError::UnknownVendors {
                suggestions: suggest(&unknown, &known),
                requested: unknown,
            });
        }
        if !unknown.is_empty() {
            tracing::warn!("Ignoring unknown vendor(s): {}", unknown.join(", "));
        }

        let mut selected = Vec::new();
        for (name, entry) in entries.iter().filter(|(name, _)| requested.contains(name)) {
            if entry.is_enabled() {
                selected.push(Arc::clone(&entry.plugin));
            } else {
                tracing::warn!("Vendor {} is disabled and will not be searched", name);
            }
        }
        Ok(selected)
    }

    /// The plugin whose base URLs cover `url`.
    ///
    /// An enabled owner wins over a disabled one. A URL owned only by a disabled
    /// plugin is `Unavailable`; a URL nobody owns is `UnsupportedUrl`.
    pub async fn owner_of(&self, url: &str) -> Result<Arc<dyn DocPlugin>, FetchError> {
        let entries = self.entries.read().await;
        let mut disabled = None;
        for (name, entry) in entries.iter().filter(|(_, entry)| entry.plugin.owns_url(url)) {
            if entry.is_enabled() {
                return Ok(Arc::clone(&entry.plugin));
            }
            disabled.get_or_insert_with(|| name.clone());
        }

        Err(match disabled {
            Some(plugin) => FetchError::Unavailable { plugin },
            None => FetchError::UnsupportedUrl {
                url: url.to_string(),
            },
        })
    }

    /// Descriptor, state and index statistics of every registered plugin.
    pub async fn plugin_info(&self) -> Vec<PluginInfo> {
        let entries: Vec<Entry> = self.entries.read().await.values().cloned().collect();

        let mut info = Vec::with_capacity(entries.len());
        for entry in entries {
            info.push(PluginInfo {
                descriptor: entry.plugin.descriptor().clone(),
                state: match entry.failure {
                    None => PluginState::Enabled,
                    Some(reason) => PluginState::Disabled { reason },
                },
                index: entry.plugin.index_stats().await,
            });
        }
        info
    }

    /// Re-read one plugin's index and swap it in if it changed.
    ///
    /// On failure the plugin keeps serving its previous index (if any).
    pub async fn reload(&self, name: &str) -> Result<ReloadOutcome, PluginError> {
        let Some(entry) = self.entries.read().await.get(name).cloned() else {
            return Err(PluginError::NotRegistered {
                plugin: name.to_string(),
            });
        };

        let before = entry.plugin.index_stats().await.map(|s| s.fingerprint);
        let result = entry.plugin.initialize(&entry.config).await;
        let after = entry.plugin.index_stats().await.map(|s| s.fingerprint);

        let mut entries = self.entries.write().await;
        let Some(current) = entries
            .get_mut(name)
            .filter(|current| Arc::ptr_eq(&current.plugin, &entry.plugin))
        else {
            // Replaced or shut down while reloading
            return Err(PluginError::NotRegistered {
                plugin: name.to_string(),
            });
        };

        match result {
            Ok(()) if !entry.is_enabled() => {
                current.failure = None;
                tracing::info!("Plugin {} loaded on reload and is now enabled", name);
                Ok(ReloadOutcome::Enabled)
            }
            Ok(()) if before == after => Ok(ReloadOutcome::Unchanged),
            Ok(()) => {
                tracing::info!("Reloaded index for {}", name);
                Ok(ReloadOutcome::Reloaded)
            }
            Err(e) => {
                if !current.is_enabled() {
                    current.failure = Some(e.to_string());
                }
                tracing::warn!("Reload of {} failed: {}", name, e);
                Err(e)
            }
        }
    }

    /// Reload every registered plugin, in name order.
    pub async fn reload_all(&self) -> Vec<(String, Result<ReloadOutcome, PluginError>)> {
        let names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.reload(&name).await;
            outcomes.push((name, outcome));
        }
        outcomes
    }

    /// Start a background task that calls [`reload_all`](Self::reload_all)
    /// every `period` until [`shutdown`](Self::shutdown).
    pub async fn spawn_reload_watcher(self: &Arc<Self>, period: Duration) {
        let registry: Weak<Self> = Arc::downgrade(self);
        let token = self.cancel.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; indexes were just loaded
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let Some(registry) = registry.upgrade() else {
                    break;
                };
                for (name, outcome) in registry.reload_all().await {
                    tracing::debug!("Reload check for {}: {:?}", name, outcome);
                }
            }
            tracing::debug!("Index reload watcher stopped");
        });

        if let Some(previous) = self.watcher.lock().await.replace(handle) {
            previous.abort();
        }
        tracing::info!("Watching plugin indexes every {:?}", period);
    }

    /// Stop the reload watcher, shut every plugin down and empty the registry.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.watcher.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::warn!("Index reload watcher ended abnormally: {}", e);
        }

        let entries = std::mem::take(&mut *self.entries.write().await);
        for (name, entry) in entries {
            entry.plugin.shutdown().await;
            tracing::debug!("Released plugin {}", name);
        }
        tracing::info!("Plugin registry shut down");
    }
}

/// Closest known names to any of `requested`, best first.
fn suggest(requested: &[String], known: &[&str]) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = known
        .iter()
        .map(|candidate| {
            let score = requested
                .iter()
                .map(|name| jaro_winkler::similarity(name.chars(), candidate.chars()))
                .fold(0.0, f64::max);
            (score, *candidate)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case(&["revv"], &["rev"])]
    #[case(&["ctr"], &["ctre"])]
    #[case(&["photon"], &["photonvision"])]
    #[case(&["zzz"], &[])]
    fn test_suggest(#[case] requested: &[&str], #[case] expected: &[&str]) {
        let requested: Vec<String> = requested.iter().map(|s| (*s).to_string()).collect();
        let known = ["ctre", "photonvision", "redux", "rev", "wpilib"];
        let suggestions = suggest(&requested, &known);
        check!(suggestions.first().map(String::as_str) == expected.first().copied());
        if expected.is_empty() {
            check!(suggestions.is_empty());
        }
    }
}
