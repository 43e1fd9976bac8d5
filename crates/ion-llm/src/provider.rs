use ion_core::error::Result;
use ion_core::types::{ChatRequest, ChatResponse, ToolDefinition};

/// Trait for LLM chat completion providers.
///
/// The orchestrator is generic over this trait so tests can script a fake
/// provider instead of talking to the network.
pub trait LlmProvider: Send + Sync {
    /// Send a chat request and receive a completion response.
    fn chat(&self, request: ChatRequest) -> impl std::future::Future<Output = Result<ChatResponse>> + Send;

    /// Send a chat request with tool definitions. The LLM may return tool calls
    /// in the response's `tool_calls` field instead of (or alongside) text content.
    /// Default implementation falls back to `chat` (ignoring tools).
    fn chat_with_tools(
        &self,
        request: ChatRequest,
        _tools: &[ToolDefinition],
    ) -> impl std::future::Future<Output = Result<ChatResponse>> + Send {
        self.chat(request)
    }

    /// Return the provider name (e.g. "openai").
    fn name(&self) -> &str;
}
