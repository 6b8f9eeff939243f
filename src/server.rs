//! MCP server exposing the documentation engine as tools.

use crate::coordinator::SearchCoordinator;
use crate::tools::fetch_page::{FetchPageRequest, handle_fetch_page};
use crate::tools::list_sections::{ListSectionsRequest, handle_list_sections};
use crate::tools::search::{SearchDocsRequest, handle_search};
use crate::tools::ToolDefaults;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// MCP Server for FRC documentation queries
#[derive(Clone)]
pub struct DocsServer {
    /// Search, fetch and listing over the plugin registry
    coordinator: Arc<SearchCoordinator>,

    /// Values for parameters the client leaves out
    defaults: Arc<ToolDefaults>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocsServer")
            .field("coordinator", &self.coordinator)
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[tool_router]
impl DocsServer {
    pub fn new(coordinator: Arc<SearchCoordinator>, defaults: ToolDefaults) -> Self {
        Self {
            coordinator,
            defaults: Arc::new(defaults),
            tool_router: Self::tool_router(),
        }
    }

    pub fn coordinator(&self) -> &Arc<SearchCoordinator> {
        &self.coordinator
    }

    #[tool(
        description = "Search FRC documentation across WPILib and vendor libraries (REV, CTRE, Redux, PhotonVision). Returns ranked results with titles, URLs, and content previews. Use vendors=['all'] for cross-vendor queries, or specify vendors to narrow the search.",
        input_schema = inline_schema_for_type::<SearchDocsRequest>()
    )]
    async fn search_frc_docs(
        &self,
        Parameters(request): Parameters<SearchDocsRequest>,
    ) -> std::result::Result<String, String> {
        handle_search(&self.coordinator, &self.defaults, request).await
    }

    #[tool(
        description = "Fetch the full content of an FRC documentation page. Automatically routes to the correct vendor based on the URL. Returns cleaned text content suitable for answering questions.",
        input_schema = inline_schema_for_type::<FetchPageRequest>()
    )]
    async fn fetch_frc_doc_page(
        &self,
        Parameters(request): Parameters<FetchPageRequest>,
    ) -> std::result::Result<String, String> {
        handle_fetch_page(&self.coordinator, request).await
    }

    #[tool(
        description = "List available FRC documentation sections per vendor with page counts. Useful for browsing what documentation each vendor provides.",
        input_schema = inline_schema_for_type::<ListSectionsRequest>()
    )]
    async fn list_frc_doc_sections(
        &self,
        Parameters(request): Parameters<ListSectionsRequest>,
    ) -> std::result::Result<String, String> {
        handle_list_sections(&self.coordinator, request).await
    }
}

#[tool_handler]
impl ServerHandler for DocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "frc-docs-mcp: BM25 search over FRC documentation from WPILib, REV, CTRE, Redux and PhotonVision. \
                 Use search_frc_docs to find pages, fetch_frc_doc_page to read one in full, \
                 and list_frc_doc_sections to browse what each vendor has indexed."
                    .to_string(),
            )
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this function sets `inline_subschemas = true`
/// so nested types are written in place instead of as $ref patterns.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let object = serde_json::to_value(schema).expect("failed to serialize schema");

    let json_object = match object {
        serde_json::Value::Object(object) => object,
        _ => panic!("Schema serialization produced non-object value"),
    };

    Arc::new(json_object)
}
