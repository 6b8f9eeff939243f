use super::{HtmlCleaner, PageFetcher};
use crate::error::FetchError;
use crate::types::FetchedPage;
use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::redirect::{Attempt, Policy};
use reqwest::{StatusCode, Url};
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

/// Fetches live documentation pages over HTTP and cleans them to text.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    cleaner: HtmlCleaner,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::custom(follow_redirect))
            .build()
            .context("Failed to build HTTP client")?;
        let cleaner = HtmlCleaner::new().context("Failed to compile HTML cleanup patterns")?;

        Ok(Self {
            client,
            cleaner,
            timeout,
        })
    }

    async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(FetchError::PageNotFound {
                    url: url.to_string(),
                });
            }
            status if !status.is_success() => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    reason: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, &e))?;
        Ok(self.cleaner.clean(url, &html))
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Follow redirects only while they stay on the host the page was requested from.
fn follow_redirect(attempt: Attempt<'_>) -> reqwest::redirect::Action {
    let verdict = attempt
        .previous()
        .first()
        .map_or(Ok(()), |origin| check_redirect(origin, attempt.url(), attempt.previous().len()));
    match verdict {
        Ok(()) => attempt.follow(),
        Err(reason) => {
            tracing::warn!("Refusing redirect to {}: {}", attempt.url(), reason);
            attempt.error(reason)
        }
    }
}

fn check_redirect(origin: &Url, target: &Url, hops: usize) -> Result<(), String> {
    if hops > MAX_REDIRECTS {
        return Err(format!("more than {} redirects", MAX_REDIRECTS));
    }
    if !target.username().is_empty() || target.password().is_some() {
        return Err("redirect target carries credentials".to_string());
    }
    if target.host_str() != origin.host_str() {
        return Err(format!(
            "redirect leaves {}",
            origin.host_str().unwrap_or_default()
        ));
    }
    Ok(())
}

impl PageFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedPage, FetchError>> {
        Box::pin(self.get(url))
    }
}
