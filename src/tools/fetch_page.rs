//! `fetch_frc_doc_page`: full cleaned content of one documentation page.

use crate::coordinator::SearchCoordinator;
use crate::error::FetchError;
use crate::types::PageContent;
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FetchPageRequest {
    /// Full URL of the documentation page to fetch
    pub url: String,
}

pub async fn handle_fetch_page(
    coordinator: &SearchCoordinator,
    request: FetchPageRequest,
) -> Result<String, String> {
    tracing::info!("Fetch page: {}", request.url);

    match coordinator.fetch_page(&request.url).await {
        Ok(page) => Ok(format_page_content(&page)),
        Err(FetchError::UnsupportedUrl { url }) => {
            let known: Vec<String> = coordinator
                .registry()
                .active()
                .await
                .iter()
                .flat_map(|plugin| plugin.descriptor().base_urls.clone())
                .collect();
            Err(format!(
                "No documentation source handles '{}'.\n\nSupported URL prefixes:\n{}",
                url,
                known
                    .iter()
                    .map(|base| format!("• {}", base))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))
        }
        Err(FetchError::Unavailable { plugin }) => Err(format!(
            "The '{}' documentation source is not available: its index is not loaded.",
            plugin
        )),
        Err(e) => Err(format!("Error: {}", e)),
    }
}

/// Markdown page with a metadata header.
pub fn format_page_content(page: &PageContent) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", page.title);
    let _ = writeln!(output, "**Source:** {}", page.vendor);
    let _ = writeln!(output, "**URL:** {}", page.url);
    if let Some(language) = &page.language {
        let _ = writeln!(output, "**Language:** {}", language);
    }
    if let Some(version) = &page.version {
        let _ = writeln!(output, "**Version:** {}", version);
    }
    if let Some(section) = &page.section {
        let _ = writeln!(output, "**Section:** {}", section);
    }
    output.push_str("\n---\n\n");
    output.push_str(&page.text);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use std::time::SystemTime;

    #[test]
    fn test_format_page_content() {
        let page = PageContent {
            url: "https://docs.wpilib.org/en/stable/docs/software/advanced-controls/pid".to_string(),
            title: "PID Control in WPILib".to_string(),
            text: "The PIDController class...".to_string(),
            vendor: "WPILib".to_string(),
            language: None,
            version: Some("2025".to_string()),
            section: Some("Advanced Controls".to_string()),
            fetched_at: SystemTime::now(),
        };
        let text = format_page_content(&page);

        check!(text.starts_with("# PID Control in WPILib\n**Source:** WPILib\n"));
        check!(!text.contains("**Language:**"));
        check!(text.contains("**Version:** 2025\n**Section:** Advanced Controls\n"));
        check!(text.ends_with("---\n\nThe PIDController class..."));
    }
}
