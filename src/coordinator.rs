//! Fan-out of one query to many plugins and merge of their rankings.

use crate::error::{FetchError, PluginFailure, SearchError};
use crate::plugins::{DocPlugin, PluginRegistry};
use crate::types::{
    DocSection, PageContent, QueryRequest, SearchResult, VendorFilter, non_blank, normalize_url,
};
use ahash::AHashSet;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Merged results of a coordinated search plus the plugins that could not
/// contribute to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub failures: Vec<PluginFailure>,
}

/// Sections of one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorSections {
    pub vendor: String,
    pub display_name: String,
    pub sections: Vec<DocSection>,
}

/// Entry point for the three core operations: search, fetch page, list sections.
#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    registry: Arc<PluginRegistry>,
    deadline: Duration,
}

impl SearchCoordinator {
    pub fn new(registry: Arc<PluginRegistry>, deadline: Duration) -> Self {
        Self { registry, deadline }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `request` against every selected plugin and merge the rankings.
    ///
    /// Plugins that fail or miss the deadline are left out and reported in
    /// [`SearchOutcome::failures`]. Scores are merged raw: BM25 values from
    /// different corpora are not renormalized.
    pub async fn coordinate(&self, request: &QueryRequest) -> Result<SearchOutcome, SearchError> {
        request.validate()?;

        let plugins = self.registry.select(&request.vendor_filter).await?;
        if plugins.is_empty() {
            return Err(SearchError::NoPlugins);
        }

        let slots = self.fan_out(&plugins, request).await;

        let mut hits = Vec::new();
        let mut failures = Vec::new();
        for (plugin, slot) in plugins.iter().zip(slots) {
            match slot {
                Some(Ok(results)) => hits.extend(results),
                Some(Err(reason)) => failures.push(PluginFailure {
                    plugin: plugin.name().to_string(),
                    reason,
                }),
                None => failures.push(PluginFailure {
                    plugin: plugin.name().to_string(),
                    reason: format!("timed out after {:?}", self.deadline),
                }),
            }
        }

        for failure in &failures {
            tracing::warn!("Search excluded {}", failure);
        }
        if failures.len() == plugins.len() {
            return Err(SearchError::AllPluginsFailed(failures));
        }

        let results = merge(hits, request.max_results);
        tracing::debug!(
            "Query {:?} matched {} result(s) across {} plugin(s)",
            request.query_text,
            results.len(),
            plugins.len() - failures.len()
        );
        Ok(SearchOutcome { results, failures })
    }

    /// Search every plugin concurrently; slot `i` holds plugin `i`'s outcome, or
    /// `None` if it was abandoned at the deadline.
    async fn fan_out(
        &self,
        plugins: &[Arc<dyn DocPlugin>],
        request: &QueryRequest,
    ) -> Vec<Option<Result<Vec<SearchResult>, String>>> {
        let deadline = Instant::now() + self.deadline;
        let mut tasks = JoinSet::new();

        for (position, plugin) in plugins.iter().enumerate() {
            let plugin = Arc::clone(plugin);
            let query = request.query_text.clone();
            let version = request.version().map(str::to_string);
            let language = request.language().map(str::to_string);
            let max_results = request.max_results;

            tasks.spawn(async move {
                let search = plugin.search(
                    &query,
                    version.as_deref(),
                    language.as_deref(),
                    max_results,
                );
                let outcome = match AssertUnwindSafe(search).catch_unwind().await {
                    Ok(Ok(results)) => Ok(results),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("search panicked".to_string()),
                };
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<Result<Vec<SearchResult>, String>>> =
            (0..plugins.len()).map(|_| None).collect();

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((position, outcome)))) => slots[position] = Some(outcome),
                Ok(Some(Err(e))) => tracing::warn!("Search task ended abnormally: {}", e),
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!("Deadline reached with {} search(es) outstanding", tasks.len());
                    tasks.abort_all();
                    break;
                }
            }
        }

        slots
    }

    /// Fetch a page through the plugin whose base URLs cover `url`.
    ///
    /// Fails with `Unavailable` when that plugin is disabled.
    pub async fn fetch_page(&self, url: &str) -> Result<PageContent, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::UnsupportedUrl {
                url: url.to_string(),
            });
        }
        let plugin = self.registry.owner_of(url).await?;

        tracing::debug!("Routing {} to {}", url, plugin.name());
        plugin.fetch_page(url).await
    }

    /// Sections of every selected vendor, in vendor-name order.
    ///
    /// A plugin that cannot list its sections is skipped; if all of them fail
    /// the call fails.
    pub async fn list_sections(
        &self,
        filter: &VendorFilter,
        version: Option<&str>,
        language: Option<&str>,
    ) -> Result<Vec<VendorSections>, SearchError> {
        let plugins = self.registry.select(filter).await?;
        if plugins.is_empty() {
            return Err(SearchError::NoPlugins);
        }

        let version = non_blank(version);
        let language = non_blank(language);
        let listings = futures::future::join_all(
            plugins
                .iter()
                .map(|plugin| plugin.list_sections(version, language)),
        )
        .await;

        let mut vendors = Vec::new();
        let mut failures = Vec::new();
        for (plugin, listing) in plugins.iter().zip(listings) {
            match listing {
                Ok(sections) => vendors.push(VendorSections {
                    vendor: plugin.name().to_string(),
                    display_name: plugin.descriptor().display_name.clone(),
                    sections,
                }),
                Err(e) => {
                    tracing::warn!("Listing sections of {} failed: {}", plugin.name(), e);
                    failures.push(PluginFailure {
                        plugin: plugin.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if vendors.is_empty() {
            return Err(SearchError::AllPluginsFailed(failures));
        }
        Ok(vendors)
    }

    /// Shortcut for [`SearchCoordinator::coordinate`] from raw parameters.
    pub async fn search(
        &self,
        query: &str,
        vendors: &[String],
        version: Option<&str>,
        language: Option<&str>,
        max_results: usize,
    ) -> Result<SearchOutcome, SearchError> {
        let mut request = QueryRequest::new(query, max_results)
            .with_vendors(VendorFilter::from_names(vendors));
        request.version_filter = version.map(str::to_string);
        request.language_filter = language.map(str::to_string);
        self.coordinate(&request).await
    }
}

/// Combine per-plugin hits into one ranking.
///
/// `hits` must be the plugins' lists concatenated in plugin order. The sort is
/// stable, so equal scores keep that order; of several hits with the same
/// normalized URL only the best-ranked survives.
pub fn merge(mut hits: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen = AHashSet::new();
    hits.retain(|hit| seen.insert(normalize_url(&hit.url)));
    hits.truncate(max_results);
    hits
}
