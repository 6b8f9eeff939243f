//! Vendor documentation plugins.
//!
//! Every vendor corpus sits behind the [`DocPlugin`] capability set. The
//! [`PluginRegistry`] owns the plugins for the process lifetime and hands
//! shared references to the coordinator and the transport layer.

pub mod catalog;
pub mod registry;
pub mod vendor;

pub use registry::{PluginInfo, PluginRegistry, PluginState, ReloadOutcome};
pub use vendor::VendorPlugin;

use crate::config::PluginConfig;
use crate::error::{FetchError, PluginError};
use crate::types::{DocSection, PageContent, PluginDescriptor, SearchResult};
use futures::future::BoxFuture;
use serde::Serialize;

/// Summary of the index a plugin currently serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub version: String,
    pub built_at: Option<String>,
    pub documents: usize,
    pub terms: usize,
    /// xxh3 of the serialized index; unchanged bytes keep the same value
    pub fingerprint: u64,
}

/// Uniform contract implemented by each vendor corpus.
///
/// Async methods return boxed futures so plugins can be stored as
/// `Arc<dyn DocPlugin>`.
pub trait DocPlugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Load (or reload) the plugin's index. The replacement is fully built
    /// before it becomes visible; on failure the previous index keeps serving.
    fn initialize<'a>(&'a self, config: &'a PluginConfig)
    -> BoxFuture<'a, Result<(), PluginError>>;

    /// Ranked hits for `query`, filtered by version/language, at most `max_results`.
    fn search<'a>(
        &'a self,
        query: &'a str,
        version: Option<&'a str>,
        language: Option<&'a str>,
        max_results: usize,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, PluginError>>;

    /// Full cleaned content of a page under one of this vendor's base URLs.
    fn fetch_page<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PageContent, FetchError>>;

    /// Distinct sections with page counts, in first-appearance order.
    fn list_sections<'a>(
        &'a self,
        version: Option<&'a str>,
        language: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<DocSection>, PluginError>>;

    /// Release the index and cached pages. Later calls report `NotInitialized`.
    fn shutdown(&self) -> BoxFuture<'_, ()>;

    /// Statistics of the loaded index, `None` before initialization.
    fn index_stats(&self) -> BoxFuture<'_, Option<IndexStats>>;

    fn owns_url(&self, url: &str) -> bool {
        self.descriptor().owns_url(url)
    }
}
