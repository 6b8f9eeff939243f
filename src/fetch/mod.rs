//! Retrieval of full documentation pages.
//!
//! [`PageFetcher`] is the boundary to the HTTP + HTML-cleaning collaborator;
//! [`FetchCache`] sits in front of it, bounding cost with a TTL and coalescing
//! concurrent requests for the same page.

pub mod cache;
pub mod html;
pub mod http;

pub use cache::FetchCache;
pub use html::HtmlCleaner;
pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::FetchedPage;
use futures::future::BoxFuture;

/// Turns a URL into cleaned page text, or a typed failure.
pub trait PageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedPage, FetchError>>;
}
