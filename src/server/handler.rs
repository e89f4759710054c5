use crate::tools::{
    AcquireInput, AcquireTool, AnalyzeInput, AnalyzeTool, CiteInput, CiteTool, ExtractInput,
    ExtractTool,
};
use crate::{Config, Result};
use rmcp::{
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData, ServerHandler,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::{future::Future, sync::Arc};
use tracing::{debug, info, instrument};

pub const ACQUIRE_TOOL: &str = "acquire_papers";
pub const EXTRACT_TOOL: &str = "extract_content";
pub const ANALYZE_TOOL: &str = "synthesize_themes";
pub const CITE_TOOL: &str = "format_citations";

const INSTRUCTIONS: &str = "Literature review pipeline. Run acquire_papers for a topic, \
then extract_content on the metadata file it writes, then synthesize_themes on the \
extracted content. format_citations renders the acquired papers as APA, IEEE or MLA.";

/// MCP handler exposing the pipeline tools
#[derive(Debug, Clone)]
pub struct LitReviewServerHandler {
    acquire: Arc<AcquireTool>,
    extract: ExtractTool,
    analyze: AnalyzeTool,
    cite: CiteTool,
}

impl LitReviewServerHandler {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        info!("Initializing literature review MCP handler");
        Ok(Self {
            acquire: Arc::new(AcquireTool::new(Arc::clone(&config))?),
            extract: ExtractTool::new(Arc::clone(&config)),
            analyze: AnalyzeTool::new(config),
            cite: CiteTool::new(),
        })
    }

    /// Definitions advertised by `tools/list`
    pub fn tool_definitions() -> Vec<Tool> {
        vec![
            Tool::new(
                ACQUIRE_TOOL,
                "Search OpenAlex for a topic and download open-access PDFs, writing paper_metadata.json",
                input_schema::<AcquireInput>(),
            ),
            Tool::new(
                EXTRACT_TOOL,
                "Extract sections and keywords from the documents listed in a metadata file",
                input_schema::<ExtractInput>(),
            ),
            Tool::new(
                ANALYZE_TOOL,
                "Aggregate extracted content into year, keyword and theme statistics",
                input_schema::<AnalyzeInput>(),
            ),
            Tool::new(
                CITE_TOOL,
                "Format citations for the papers in a metadata file (APA, IEEE or MLA)",
                input_schema::<CiteInput>(),
            ),
        ]
    }

    /// Run the named tool on raw MCP arguments
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> std::result::Result<serde_json::Value, ErrorData> {
        match name {
            ACQUIRE_TOOL => Ok(self.acquire.run(parse_arguments(arguments)?).await),
            EXTRACT_TOOL => Ok(self.extract.run(parse_arguments(arguments)?).await),
            ANALYZE_TOOL => Ok(self.analyze.run(parse_arguments(arguments)?).await),
            CITE_TOOL => Ok(self.cite.run(parse_arguments(arguments)?).await),
            other => Err(ErrorData::invalid_request(
                format!("Unknown tool: {other}"),
                None,
            )),
        }
    }
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> std::result::Result<T, ErrorData> {
    serde_json::from_value(serde_json::Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ErrorData::invalid_params(format!("Invalid tool input: {e}"), None))
}

impl ServerHandler for LitReviewServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _request, _context))]
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, ErrorData>> + Send + '_ {
        debug!("Listing available tools");
        async move {
            Ok(ListToolsResult {
                tools: Self::tool_definitions(),
                next_cursor: None,
            })
        }
    }

    #[instrument(skip(self, request, _context), fields(tool = %request.name))]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, ErrorData>> + Send + '_ {
        info!("Tool called: {}", request.name);
        async move {
            let payload = self.dispatch(&request.name, request.arguments).await?;
            let text = serde_json::to_string_pretty(&payload).map_err(|e| {
                ErrorData::internal_error(format!("Serialization failed: {e}"), None)
            })?;

            if payload.get("error").is_some() {
                Ok(CallToolResult::error(vec![Content::text(text)]))
            } else {
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_handler(dir: &std::path::Path) -> LitReviewServerHandler {
        let mut config = Config::default();
        config.output.directory = dir.join("outputs");
        config.downloads.directory = dir.join("papers");
        LitReviewServerHandler::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn test_tool_definitions() {
        let tools = LitReviewServerHandler::tool_definitions();
        let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(
            names,
            vec![ACQUIRE_TOOL, EXTRACT_TOOL, ANALYZE_TOOL, CITE_TOOL]
        );

        let acquire_schema = serde_json::Value::Object((*tools[0].input_schema).clone());
        assert!(acquire_schema["properties"].get("topic").is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let handler = create_test_handler(dir.path());
        assert!(handler.dispatch("search_papers", None).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let handler = create_test_handler(dir.path());
        // metadata_file is required
        assert!(handler.dispatch(EXTRACT_TOOL, None).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_input_is_payload() {
        let dir = tempfile::tempdir().unwrap();
        let handler = create_test_handler(dir.path());
        let mut arguments = JsonObject::new();
        arguments.insert(
            "extracted_content_file".to_string(),
            serde_json::json!(dir.path().join("absent.json")),
        );

        let payload = handler
            .dispatch(ANALYZE_TOOL, Some(arguments))
            .await
            .unwrap();
        assert!(payload["error"]
            .as_str()
            .unwrap()
            .starts_with("Extracted content file not found"));
    }
}
