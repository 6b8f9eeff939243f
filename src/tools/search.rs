//! `search_frc_docs`: ranked search across vendor documentation.

use super::{ToolDefaults, default_vendors, format_search_error};
use crate::coordinator::{SearchCoordinator, SearchOutcome};
use crate::types::{QueryRequest, VendorFilter};
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchDocsRequest {
    /// Search query (e.g., 'SparkMax configure', 'PID tuning')
    pub query: String,
    /// Vendors to search: ["all"] or specific like ["wpilib", "rev", "ctre"]
    #[serde(default = "default_vendors")]
    pub vendors: Vec<String>,
    /// Documentation version (e.g., '2025', '2024')
    #[serde(default)]
    pub version: Option<String>,
    /// Programming language filter (e.g., 'Java', 'Python', 'C++')
    #[serde(default)]
    pub language: Option<String>,
    /// Maximum results, 1 to 25 (fewer for quick lookups, more for research)
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl SearchDocsRequest {
    /// Build the core request, filling omitted parameters from `defaults`.
    pub fn into_query(self, defaults: &ToolDefaults) -> QueryRequest {
        QueryRequest {
            query_text: self.query,
            vendor_filter: VendorFilter::from_names(&self.vendors),
            version_filter: self.version.or_else(|| defaults.version.clone()),
            language_filter: self.language.or_else(|| defaults.language.clone()),
            max_results: self.max_results.unwrap_or(defaults.max_results),
        }
    }
}

/// Execute a search and render it as markdown.
pub async fn handle_search(
    coordinator: &SearchCoordinator,
    defaults: &ToolDefaults,
    request: SearchDocsRequest,
) -> Result<String, String> {
    let query = request.into_query(defaults);
    tracing::info!(
        "Search: query={:?}, vendors={:?}, version={:?}, language={:?}, max={}",
        query.query_text,
        query.vendor_filter,
        query.version_filter,
        query.language_filter,
        query.max_results
    );

    match coordinator.coordinate(&query).await {
        Ok(outcome) => Ok(format_search_results(&outcome)),
        Err(e) => {
            let available = coordinator.registry().enabled_names().await;
            Err(format_search_error(&e, &available))
        }
    }
}

/// Markdown listing of merged hits, followed by any sources that were skipped.
pub fn format_search_results(outcome: &SearchOutcome) -> String {
    let mut output = String::new();

    if outcome.results.is_empty() {
        output.push_str("No results found.\n");
    } else {
        let _ = writeln!(output, "Found {} result(s):\n", outcome.results.len());
        for (i, result) in outcome.results.iter().enumerate() {
            let _ = writeln!(output, "## {}. {}", i + 1, result.title);
            let _ = writeln!(
                output,
                "**Vendor:** {} | **Section:** {}",
                result.vendor, result.section
            );
            if !result.language.is_empty() {
                let _ = writeln!(
                    output,
                    "**Language:** {} | **Version:** {} | **Score:** {:.2}",
                    result.language, result.version, result.score
                );
            }
            let _ = writeln!(output, "**URL:** {}", result.url);
            if !result.preview_text.is_empty() {
                let _ = writeln!(output, "\n{}", result.preview_text);
            }
            output.push_str("\n---\n\n");
        }
    }

    if !outcome.failures.is_empty() {
        let skipped: Vec<String> = outcome.failures.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            output,
            "\n*Some sources could not be searched: {}*",
            skipped.join("; ")
        );
    }

    output.trim_end().to_string()
}
