//! Value types shared by the search engine, plugins and the transport adapter.

use crate::error::RequestError;
use reqwest::Url;
use serde::Serialize;
use std::time::SystemTime;

/// Inclusive bounds for `QueryRequest::max_results`.
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=25;

/// A single page of a vendor corpus. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Position within the owning index; unique per index only.
    pub id: u32,
    pub url: String,
    pub title: String,
    pub section: String,
    pub language: String,
    /// Documentation version, inherited from the index it was loaded from.
    pub version: String,
    pub full_text: String,
    pub preview_text: String,
}

/// One ranked hit produced for a query. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub section: String,
    pub language: String,
    pub version: String,
    /// Display name of the vendor whose index produced this hit.
    pub vendor: String,
    pub score: f64,
    pub preview_text: String,
}

/// Cleaned text of a documentation page as returned by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub fetched_at: SystemTime,
}

/// Full page content handed back to callers of `fetch_page`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub text: String,
    pub vendor: String,
    pub language: Option<String>,
    pub version: Option<String>,
    pub section: Option<String>,
    pub fetched_at: SystemTime,
}

/// A documentation section and the number of indexed pages in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSection {
    pub name: String,
    pub vendor: String,
    pub page_count: usize,
}

/// Static metadata describing one vendor plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub supported_versions: Vec<String>,
    pub supported_languages: Vec<String>,
    pub base_urls: Vec<String>,
}

impl PluginDescriptor {
    /// Whether `url` lies under one of this vendor's base URLs.
    ///
    /// Scheme, host and port must match exactly and the path must continue the
    /// base path at a segment boundary. URLs carrying credentials or failing to
    /// parse are never owned.
    pub fn owns_url(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url.trim()) else {
            return false;
        };
        if !url.username().is_empty() || url.password().is_some() {
            return false;
        }
        self.base_urls
            .iter()
            .filter_map(|base| Url::parse(base.trim()).ok())
            .any(|base| url_under(&base, &url))
    }
}

fn url_under(base: &Url, url: &Url) -> bool {
    if base.scheme() != url.scheme()
        || base.host_str().is_none()
        || base.host_str() != url.host_str()
        || base.port_or_known_default() != url.port_or_known_default()
    {
        return false;
    }

    let prefix = base.path().trim_end_matches('/').to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(&prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Which vendors a request should reach.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VendorFilter {
    #[default]
    All,
    Only(Vec<String>),
}

impl VendorFilter {
    /// Build a filter from transport-level vendor names; `"all"` or an empty list selects everything.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            if name == "all" {
                return Self::All;
            }
            if !selected.contains(&name) {
                selected.push(name);
            }
        }

        if selected.is_empty() {
            Self::All
        } else {
            Self::Only(selected)
        }
    }
}

/// A caller-supplied search request, validated before fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_text: String,
    pub vendor_filter: VendorFilter,
    pub version_filter: Option<String>,
    pub language_filter: Option<String>,
    pub max_results: usize,
}

impl QueryRequest {
    pub fn new(query_text: impl Into<String>, max_results: usize) -> Self {
        Self {
            query_text: query_text.into(),
            vendor_filter: VendorFilter::All,
            version_filter: None,
            language_filter: None,
            max_results,
        }
    }

    pub fn with_vendors(mut self, vendor_filter: VendorFilter) -> Self {
        self.vendor_filter = vendor_filter;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version_filter = Some(version.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_filter = Some(language.into());
        self
    }

    /// Reject malformed requests. `max_results` outside `[1, 25]` is rejected, not clamped.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.query_text.trim().is_empty() {
            return Err(RequestError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            return Err(RequestError::InvalidRequest(format!(
                "max_results must be between {} and {}, got {}",
                MAX_RESULTS_RANGE.start(),
                MAX_RESULTS_RANGE.end(),
                self.max_results
            )));
        }
        Ok(())
    }

    pub(crate) fn version(&self) -> Option<&str> {
        non_blank(self.version_filter.as_deref())
    }

    pub(crate) fn language(&self) -> Option<&str> {
        non_blank(self.language_filter.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Canonical form of a URL used for cache keys, URL lookups and result de-duplication.
///
/// Lowercased, fragment dropped, trailing slash dropped. Unparseable input falls
/// back to the same treatment on the raw string.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let mut normalized = match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string().to_lowercase()
        }
        Err(_) => trimmed
            .split('#')
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };

    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
