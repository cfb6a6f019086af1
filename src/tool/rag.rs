// file: src/tool/rag.rs
// description: knowledge-base search tool backed by the shared query engine
// reference: https://docs.rs/schemars

use crate::error::Result;
use crate::rag::QueryEngine;
use crate::tool::Tool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const RAG_TOOL_NAME: &str = "rag";
pub const RAG_TOOL_DESCRIPTION: &str = "Search the knowledge base for information";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Query {
    pub query_for_neural_search: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RagResult {
    pub result: String,
}

/// The `rag` tool: one retrieval-and-synthesis call per invocation against
/// the engine shared with the application shell.
pub struct RagTool {
    engine: Arc<QueryEngine>,
}

impl RagTool {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for RagTool {
    fn name(&self) -> &str {
        RAG_TOOL_NAME
    }

    fn description(&self) -> &str {
        RAG_TOOL_DESCRIPTION
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Query))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    fn response_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RagResult))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let query: Query = serde_json::from_value(arguments)?;

        info!("Searching for: {}", query.query_for_neural_search);
        let answer = self.engine.query(&query.query_for_neural_search).await?;
        info!("RAG response: {}", answer.text);

        Ok(serde_json::to_value(RagResult {
            result: answer.text,
        })?)
    }
}
