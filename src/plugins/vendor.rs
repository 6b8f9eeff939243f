//! The concrete plugin backing every vendor corpus.

use super::{DocPlugin, IndexStats};
use crate::config::PluginConfig;
use crate::error::{FetchError, PluginError};
use crate::fetch::{FetchCache, PageFetcher};
use crate::search::{CorpusIndex, rank};
use crate::types::{
    DocSection, Document, PageContent, PluginDescriptor, SearchResult, non_blank,
};
use ahash::AHashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Index and page cache of an initialized plugin.
#[derive(Clone)]
struct Loaded {
    index: Arc<CorpusIndex>,
    cache: FetchCache,
}

/// One vendor corpus: an index file on disk, vendor metadata, and a page cache
/// in front of the shared fetcher.
pub struct VendorPlugin {
    descriptor: PluginDescriptor,
    fetcher: Arc<dyn PageFetcher>,
    state: RwLock<Option<Loaded>>,
}

impl std::fmt::Debug for VendorPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorPlugin")
            .field("name", &self.descriptor.name)
            .field("base_urls", &self.descriptor.base_urls)
            .finish_non_exhaustive()
    }
}

impl VendorPlugin {
    pub fn new(descriptor: PluginDescriptor, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            descriptor,
            fetcher,
            state: RwLock::new(None),
        }
    }

    async fn loaded(&self) -> Option<Loaded> {
        self.state.read().await.clone()
    }

    async fn index(&self) -> Result<Arc<CorpusIndex>, PluginError> {
        self.loaded()
            .await
            .map(|loaded| loaded.index)
            .ok_or_else(|| PluginError::NotInitialized {
                plugin: self.descriptor.name.clone(),
            })
    }

    async fn load(&self, config: &PluginConfig) -> Result<(), PluginError> {
        let name = self.descriptor.name.as_str();
        let path = &config.index_path;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PluginError::init(name, format!("cannot read index {}: {}", path.display(), e))
        })?;

        let current = self.loaded().await;
        let fingerprint = CorpusIndex::fingerprint_of(&bytes);

        let unchanged_index = current
            .as_ref()
            .filter(|loaded| loaded.index.fingerprint() == fingerprint)
            .map(|loaded| Arc::clone(&loaded.index));
        let reusable_cache = current
            .as_ref()
            .filter(|loaded| {
                loaded.cache.ttl() == config.ttl()
                    && loaded.cache.fetch_timeout() == config.fetch_timeout
            })
            .map(|loaded| loaded.cache.clone());

        if unchanged_index.is_some() && reusable_cache.is_some() {
            tracing::debug!("Index for {} unchanged, keeping loaded copy", name);
            return Ok(());
        }

        let index = match unchanged_index {
            Some(index) => index,
            None => {
                // Build the replacement off to the side; readers keep the old one
                let index = tokio::task::spawn_blocking(move || CorpusIndex::load(&bytes))
                    .await
                    .map_err(|e| PluginError::init(name, e))?
                    .map_err(|e| PluginError::init(name, e))?;
                self.check_index(&index);
                Arc::new(index)
            }
        };

        let cache = reusable_cache.unwrap_or_else(|| {
            FetchCache::new(
                Arc::clone(&self.fetcher),
                config.ttl(),
                config.fetch_timeout,
            )
        });

        tracing::info!(
            "Loaded {} pages for {} (version {}) from {}",
            index.document_count(),
            name,
            index.version(),
            path.display()
        );
        *self.state.write().await = Some(Loaded { index, cache });
        Ok(())
    }

    fn check_index(&self, index: &CorpusIndex) {
        let name = &self.descriptor.name;
        if !index.vendor().eq_ignore_ascii_case(name) {
            tracing::warn!(
                "Index for {} declares vendor '{}'",
                name,
                index.vendor()
            );
        }
        let versions = &self.descriptor.supported_versions;
        if !versions.is_empty()
            && !versions
                .iter()
                .any(|v| v.eq_ignore_ascii_case(index.version()))
        {
            tracing::warn!(
                "Index for {} has version {}, expected one of {}",
                name,
                index.version(),
                versions.join(", ")
            );
        }
    }

    fn to_result(&self, document: &Document, score: f64) -> SearchResult {
        SearchResult {
            url: document.url.clone(),
            title: document.title.clone(),
            section: document.section.clone(),
            language: document.language.clone(),
            version: document.version.clone(),
            vendor: self.descriptor.display_name.clone(),
            score,
            preview_text: document.preview_text.clone(),
        }
    }
}

/// Exact, ASCII case-insensitive match; no filter matches everything.
fn matches(value: &str, filter: Option<&str>) -> bool {
    non_blank(filter).is_none_or(|wanted| value.eq_ignore_ascii_case(wanted))
}

fn matches_filters(document: &Document, version: Option<&str>, language: Option<&str>) -> bool {
    matches(&document.version, version) && matches(&document.language, language)
}

impl DocPlugin for VendorPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn initialize<'a>(
        &'a self,
        config: &'a PluginConfig,
    ) -> BoxFuture<'a, Result<(), PluginError>> {
        Box::pin(self.load(config))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        version: Option<&'a str>,
        language: Option<&'a str>,
        max_results: usize,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, PluginError>> {
        Box::pin(async move {
            let index = self.index().await?;

            let results: Vec<SearchResult> = rank(&index, query)
                .iter()
                .filter(|hit| matches_filters(hit.document, version, language))
                .take(max_results)
                .map(|hit| self.to_result(hit.document, hit.score))
                .collect();

            tracing::debug!(
                "{}: {} result(s) for {:?}",
                self.descriptor.name,
                results.len(),
                query
            );
            Ok(results)
        })
    }

    fn fetch_page<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<PageContent, FetchError>> {
        Box::pin(async move {
            if !self.owns_url(url) {
                return Err(FetchError::UnsupportedUrl {
                    url: url.to_string(),
                });
            }

            let Some(Loaded { index, cache }) = self.loaded().await else {
                return Err(FetchError::Unavailable {
                    plugin: self.descriptor.name.clone(),
                });
            };

            let page = cache.get_or_fetch(url).await?;
            let indexed = index.find_by_url(url);

            let title = page
                .title
                .clone()
                .or_else(|| indexed.map(|doc| doc.title.clone()))
                .unwrap_or_else(|| format!("{} Documentation", self.descriptor.display_name));

            Ok(PageContent {
                url: page.url.clone(),
                title,
                text: page.text.clone(),
                vendor: self.descriptor.display_name.clone(),
                language: indexed.map(|doc| doc.language.clone()),
                version: indexed.map(|doc| doc.version.clone()),
                section: indexed.map(|doc| doc.section.clone()),
                fetched_at: page.fetched_at,
            })
        })
    }

    fn list_sections<'a>(
        &'a self,
        version: Option<&'a str>,
        language: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<DocSection>, PluginError>> {
        Box::pin(async move {
            let index = self.index().await?;

            let mut sections: Vec<DocSection> = Vec::new();
            let mut positions: AHashMap<&str, usize> = AHashMap::new();
            for document in index
                .documents()
                .iter()
                .filter(|doc| matches_filters(doc, version, language))
            {
                if let Some(&position) = positions.get(document.section.as_str()) {
                    sections[position].page_count += 1;
                } else {
                    positions.insert(&document.section, sections.len());
                    sections.push(DocSection {
                        name: document.section.clone(),
                        vendor: self.descriptor.name.clone(),
                        page_count: 1,
                    });
                }
            }

            Ok(sections)
        })
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(loaded) = self.state.write().await.take() {
                loaded.cache.clear().await;
                tracing::info!("Shut down plugin {}", self.descriptor.name);
            }
        })
    }

    fn index_stats(&self) -> BoxFuture<'_, Option<IndexStats>> {
        Box::pin(async move {
            self.loaded().await.map(|loaded| IndexStats {
                version: loaded.index.version().to_string(),
                built_at: loaded.index.built_at().map(str::to_string),
                documents: loaded.index.document_count(),
                terms: loaded.index.term_count(),
                fingerprint: loaded.index.fingerprint(),
            })
        })
    }
}
