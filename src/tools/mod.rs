//! Handlers behind the MCP tools: request types, parameter defaults and
//! markdown rendering of results.

pub mod fetch_page;
pub mod list_sections;
pub mod search;

pub use fetch_page::*;
pub use list_sections::*;
pub use search::*;

use crate::config::SearchSettings;
use crate::error::{RequestError, SearchError};

/// Vendor list used when a request names none.
pub(crate) fn default_vendors() -> Vec<String> {
    vec!["all".to_string()]
}

/// Values applied to tool parameters the caller left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefaults {
    pub max_results: usize,
    pub version: Option<String>,
    pub language: Option<String>,
}

impl From<&SearchSettings> for ToolDefaults {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            max_results: settings.default_max_results,
            version: settings.default_version.clone(),
            language: settings.default_language.clone(),
        }
    }
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self::from(&SearchSettings::default())
    }
}

/// Render a coordinator failure for the tool caller.
pub fn format_search_error(error: &SearchError, available: &[String]) -> String {
    let available = if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    };

    match error {
        SearchError::Request(RequestError::UnknownVendors {
            requested,
            suggestions,
        }) => {
            let mut message = format!("Unknown vendor(s): {}.", requested.join(", "));
            if !suggestions.is_empty() {
                message.push_str(&format!(" Did you mean: {}?", suggestions.join(", ")));
            }
            message.push_str(&format!("\n\nAvailable vendors: {}", available));
            message
        }
        SearchError::NoPlugins => format!(
            "No documentation sources are available for this request.\n\nAvailable vendors: {}",
            available
        ),
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginFailure;
    use assert2::check;

    #[test]
    fn test_unknown_vendor_message_lists_suggestions() {
        let error = SearchError::Request(RequestError::UnknownVendors {
            requested: vec!["revv".to_string()],
            suggestions: vec!["rev".to_string()],
        });
        let message = format_search_error(&error, &["rev".to_string(), "wpilib".to_string()]);
        check!(message.starts_with("Unknown vendor(s): revv. Did you mean: rev?"));
        check!(message.ends_with("Available vendors: rev, wpilib"));
    }

    #[test]
    fn test_all_failed_message() {
        let error = SearchError::AllPluginsFailed(vec![PluginFailure {
            plugin: "ctre".to_string(),
            reason: "timed out after 5s".to_string(),
        }]);
        let message = format_search_error(&error, &[]);
        check!(message == "Error: every selected plugin failed: ctre: timed out after 5s");
    }

    #[test]
    fn test_defaults_from_settings() {
        let defaults = ToolDefaults::default();
        check!(defaults.max_results == 10);
        check!(defaults.version.is_none());
    }
}
