//! `list_frc_doc_sections`: browse what each vendor has indexed.

use super::{default_vendors, format_search_error};
use crate::coordinator::{SearchCoordinator, VendorSections};
use crate::types::VendorFilter;
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSectionsRequest {
    /// Vendors to list: ["all"] or specific like ["wpilib", "rev"]
    #[serde(default = "default_vendors")]
    pub vendors: Vec<String>,
    /// Documentation version
    #[serde(default)]
    pub version: Option<String>,
    /// Programming language filter
    #[serde(default)]
    pub language: Option<String>,
}

pub async fn handle_list_sections(
    coordinator: &SearchCoordinator,
    request: ListSectionsRequest,
) -> Result<String, String> {
    let filter = VendorFilter::from_names(&request.vendors);
    match coordinator
        .list_sections(
            &filter,
            request.version.as_deref(),
            request.language.as_deref(),
        )
        .await
    {
        Ok(vendors) => Ok(format_sections(&vendors)),
        Err(e) => {
            let available = coordinator.registry().enabled_names().await;
            Err(format_search_error(&e, &available))
        }
    }
}

/// Markdown outline of sections per vendor.
pub fn format_sections(vendors: &[VendorSections]) -> String {
    if vendors.is_empty() {
        return "No documentation sections available.".to_string();
    }

    let mut output = String::from("# Available Documentation Sections\n\n");
    for vendor in vendors {
        let _ = writeln!(output, "## {}\n", vendor.vendor.to_uppercase());
        if vendor.sections.is_empty() {
            output.push_str("No sections available.\n\n");
            continue;
        }
        for section in &vendor.sections {
            let _ = writeln!(output, "### {}", section.name);
            let noun = if section.page_count == 1 { "page" } else { "pages" };
            let _ = writeln!(output, "*{} {}*\n", section.page_count, noun);
        }
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocSection;
    use assert2::check;

    #[test]
    fn test_format_sections() {
        let vendors = vec![
            VendorSections {
                vendor: "rev".to_string(),
                display_name: "REV Robotics".to_string(),
                sections: vec![
                    DocSection {
                        name: "Motor Controllers".to_string(),
                        vendor: "rev".to_string(),
                        page_count: 12,
                    },
                    DocSection {
                        name: "Sensors".to_string(),
                        vendor: "rev".to_string(),
                        page_count: 1,
                    },
                ],
            },
            VendorSections {
                vendor: "redux".to_string(),
                display_name: "Redux Robotics".to_string(),
                sections: vec![],
            },
        ];
        let text = format_sections(&vendors);

        check!(text.starts_with("# Available Documentation Sections\n\n## REV\n"));
        check!(text.contains("### Motor Controllers\n*12 pages*"));
        check!(text.contains("### Sensors\n*1 page*"));
        check!(text.ends_with("## REDUX\n\nNo sections available."));
    }

    #[test]
    fn test_format_no_vendors() {
        check!(format_sections(&[]) == "No documentation sections available.");
    }
}
