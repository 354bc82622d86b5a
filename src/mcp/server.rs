//! Catalog MCP Server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use catalog_rag::search::orchestrator::clamp_top_k;
use catalog_rag::{load_documents, QueryOrchestrator};

use crate::commands::CommandContext;

/// Parameters for rag_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// Natural language question (e.g., "i need a laptop for programming")
    #[schemars(description = "Natural language question about the catalog")]
    pub query: String,
    #[schemars(description = "Number of products to retrieve (default: 5, max: 100)")]
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Parameters for rag_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 5, max: 100)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for rag_index tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexParams {
    #[schemars(description = "Path to a JSON catalog file")]
    pub catalog: String,
}

#[derive(Clone)]
pub struct CatalogService {
    orchestrator: Arc<QueryOrchestrator>,
    default_top_k: usize,
    tool_router: ToolRouter<Self>,
}

impl CatalogService {
    pub fn new(orchestrator: Arc<QueryOrchestrator>, default_top_k: usize) -> Self {
        Self {
            orchestrator,
            default_top_k,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

#[tool_router]
impl CatalogService {
    #[tool(description = "Answer a question about the product catalog. Returns a templated answer, the relevant products, and a confidence score.")]
    async fn rag_query(&self, params: Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let top_k = clamp_top_k(params.0.top_k, self.default_top_k);
        let response = self.orchestrator.query(&params.0.query, top_k).await;
        to_json(&response)
    }

    #[tool(description = "Search the product catalog. Uses semantic similarity when the vector backend is available, keyword overlap otherwise.")]
    async fn rag_search(&self, params: Parameters<SearchParams>) -> Result<CallToolResult, McpError> {
        let limit = clamp_top_k(params.0.limit, self.default_top_k);
        let results = self
            .orchestrator
            .gateway()
            .search(&params.0.query, limit)
            .await
            .map_err(|e| McpError::internal_error(format!("Search failed: {}", e), None))?;
        to_json(&results)
    }

    #[tool(description = "Index products from a JSON catalog file into the active store.")]
    async fn rag_index(&self, params: Parameters<IndexParams>) -> Result<CallToolResult, McpError> {
        let documents = load_documents(&PathBuf::from(&params.0.catalog))
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let report = self
            .orchestrator
            .gateway()
            .index(documents)
            .await
            .map_err(|e| McpError::internal_error(format!("Indexing failed: {}", e), None))?;
        to_json(&report)
    }

    #[tool(description = "Get retrieval status: active mode and collection or fallback index details.")]
    async fn rag_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.orchestrator.gateway().status().await;
        to_json(&status)
    }
}

#[tool_handler]
impl ServerHandler for CatalogService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Product catalog retrieval server. Answers questions and searches products with semantic or keyword search.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(ctx: &CommandContext, catalog: Option<&PathBuf>) -> Result<()> {
    use tokio::io::{stdin, stdout};

    // json = true: nothing may be printed on the stdio transport
    let gateway = ctx.open_gateway(catalog, true).await?;
    info!("Starting MCP server in {} mode", gateway.mode());

    let service = CatalogService::new(
        Arc::new(QueryOrchestrator::new(gateway)),
        ctx.settings.default_top_k,
    );
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
