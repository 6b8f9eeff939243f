//! Error handling types and utilities.

use std::time::Duration;

/// A specialized Result type for glue code (configuration, startup).
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods. Domain operations return the typed errors below.
pub type Result<T> = anyhow::Result<T>;

/// Error returned when a serialized index cannot be turned into a `CorpusIndex`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Required fields are missing or have the wrong shape.
    #[error("corrupt index: {reason}")]
    Corrupt { reason: String },
    /// The file was written by an incompatible index builder.
    #[error("index schema version {found} is not supported (reader supports {supported})")]
    VersionMismatch { found: u32, supported: u32 },
}

/// Errors raised by a plugin outside of the fetch path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PluginError {
    /// `initialize` failed; the plugin is disabled but the registry keeps serving.
    #[error("plugin '{plugin}' failed to initialize: {reason}")]
    Init { plugin: String, reason: String },
    /// An operation was invoked before a successful `initialize`.
    #[error("plugin '{plugin}' is not initialized")]
    NotInitialized { plugin: String },
    #[error("no plugin named '{plugin}' is registered")]
    NotRegistered { plugin: String },
}

impl PluginError {
    pub(crate) fn init(plugin: &str, reason: impl std::fmt::Display) -> Self {
        Self::Init {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from the "fetch full page" path.
///
/// `Clone` because one coalesced fetch result is handed to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("no documentation source handles URL '{url}'")]
    UnsupportedUrl { url: String },
    #[error("page not found: {url}")]
    PageNotFound { url: String },
    #[error("fetching {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    /// The owning plugin is disabled or shut down.
    #[error("documentation source '{plugin}' is not available")]
    Unavailable { plugin: String },
}

/// A malformed `QueryRequest`, rejected before any plugin is consulted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown vendor(s): {}", .requested.join(", "))]
    UnknownVendors {
        requested: Vec<String>,
        /// Closest known vendor names, best first.
        suggestions: Vec<String>,
    },
}

/// One plugin that could not contribute to a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PluginFailure {
    pub plugin: String,
    pub reason: String,
}

impl std::fmt::Display for PluginFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.plugin, self.reason)
    }
}

/// Aggregate failure of a coordinated search.
///
/// A search that ran but matched nothing is *not* an error; these variants mean
/// the engine could not search at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("no documentation plugins are enabled")]
    NoPlugins,
    #[error("every selected plugin failed: {}", format_failures(.0))]
    AllPluginsFailed(Vec<PluginFailure>),
}

fn format_failures(failures: &[PluginFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
