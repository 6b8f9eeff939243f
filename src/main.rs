use frc_docs_mcp::{
    Config, DocsServer, HttpFetcher, PluginRegistry, SearchCoordinator, ToolDefaults,
};
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    frc_docs_mcp::tracing::init();
    tracing::info!("Starting frc-docs-mcp MCP server");

    // Optional config path; otherwise $FRC_DOCS_MCP_CONFIG or the user config dir
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.cache.fetch_timeout_secs,
    ))?);
    let registry = Arc::new(PluginRegistry::from_config(&config, fetcher).await);
    if let Some(period) = config.reload_interval() {
        registry.spawn_reload_watcher(period).await;
    }

    let coordinator = Arc::new(SearchCoordinator::new(
        Arc::clone(&registry),
        config.deadline(),
    ));
    let server = DocsServer::new(coordinator, ToolDefaults::from(&config.search));

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    // Wait for the client to disconnect, then release plugin resources
    let quit = service.waiting().await;
    registry.shutdown().await;
    quit?;

    Ok(())
}
