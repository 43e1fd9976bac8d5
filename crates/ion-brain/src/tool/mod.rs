pub mod finance;
pub mod reminder;
pub mod savings;
pub mod shopping;
pub mod task;

use async_trait::async_trait;
use ion_core::types::ToolDefinition;

/// Result of executing a tool.
///
/// Always a string fed back to the model — validation failures and
/// clarifying questions travel in-band, never as errors.
pub struct ToolResult {
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { output: output.into() }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { output: format!("Erro: {}", message.into()) }
    }
}

/// A tool the LLM can call during the orchestration loop.
///
/// Each tool struct owns its dependencies and can provide multiple tool
/// definitions (e.g. FinanceTool provides create_transaction and
/// list_transactions).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool definitions this struct provides.
    fn definitions(&self) -> Vec<ToolDefinition>;
    /// Execute a tool call by name. Only called for names in definitions().
    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult;
}

/// Registry mapping tool names to their handlers.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().flat_map(|t| t.definitions()).collect()
    }

    pub async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        for tool in &self.tools {
            if tool.definitions().iter().any(|d| d.name == name) {
                return tool.execute(name, args).await;
            }
        }
        ToolResult::err(format!("ferramenta desconhecida: {name}"))
    }
}
