//! BM25 relevance search and aggregation over FRC vendor documentation,
//! served to AI assistants over MCP.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod plugins;
pub mod search;
pub mod server;
pub mod tools;
pub mod tracing;
pub mod types;

pub use config::{Config, PluginConfig};
pub use coordinator::{SearchCoordinator, SearchOutcome, VendorSections, merge};
pub use error::{
    FetchError, IndexError, PluginError, PluginFailure, RequestError, Result, SearchError,
};
pub use fetch::{FetchCache, HtmlCleaner, HttpFetcher, PageFetcher};
pub use plugins::{
    DocPlugin, IndexStats, PluginInfo, PluginRegistry, PluginState, ReloadOutcome, VendorPlugin,
};
pub use search::{CorpusIndex, rank, tokenize};
pub use server::DocsServer;
pub use tools::ToolDefaults;
pub use types::{
    DocSection, Document, FetchedPage, PageContent, PluginDescriptor, QueryRequest, SearchResult,
    VendorFilter, normalize_url,
};
