use ion_core::error::{IonError, Result};
use ion_core::types::{ChatRequest, ChatResponse, ToolCallRequest, ToolDefinition, Usage};
use reqwest::Client;
use serde_json::json;

use crate::provider::LlmProvider;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completion provider with function-calling support.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    /// Create a new OpenAI chat provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model identifier (e.g. "gpt-4o-mini")
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    /// Build the messages array in the Chat Completions wire format.
    /// Assistant tool calls carry their arguments as a JSON-encoded string;
    /// tool results are `role: "tool"` messages keyed by `tool_call_id`.
    fn build_messages(request: &ChatRequest) -> Vec<serde_json::Value> {
        request
            .messages
            .iter()
            .map(|m| {
                if !m.tool_calls.is_empty() {
                    let tool_calls: Vec<serde_json::Value> = m
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string(),
                                },
                            })
                        })
                        .collect();
                    let mut msg = json!({
                        "role": "assistant",
                        "tool_calls": tool_calls,
                    });
                    if !m.content.is_empty() {
                        msg.as_object_mut()
                            .unwrap()
                            .insert("content".to_string(), json!(m.content));
                    }
                    msg
                } else if m.role == "tool" {
                    json!({
                        "role": "tool",
                        "tool_call_id": m.tool_call_id.as_deref().unwrap_or(""),
                        "content": m.content,
                    })
                } else {
                    json!({
                        "role": m.role,
                        "content": m.content,
                    })
                }
            })
            .collect()
    }

    async fn send(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| IonError::Llm {
                provider: "openai".to_string(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        let response_text = response.text().await.map_err(|e| IonError::Llm {
            provider: "openai".to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http {
                status,
                body: response_text,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| IonError::Llm {
            provider: "openai".to_string(),
            message: format!("failed to parse response JSON: {e}"),
        })
    }

    /// Extract content, tool calls and usage from a completions response.
    fn parse_response(parsed: &serde_json::Value) -> Result<ChatResponse> {
        let message = parsed["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| IonError::Llm {
                provider: "openai".to_string(),
                message: "missing choices[0].message in response".to_string(),
            })?;

        let content = message["content"].as_str().unwrap_or("").to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let id = call["id"].as_str().unwrap_or("").to_string();
                let name = call["function"]["name"].as_str().unwrap_or("").to_string();
                // Arguments arrive as a JSON-encoded string.
                let arguments = call["function"]["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));
                tool_calls.push(ToolCallRequest { id, name, arguments });
            }
        }

        let usage = match (
            parsed["usage"]["prompt_tokens"].as_u64(),
            parsed["usage"]["completion_tokens"].as_u64(),
        ) {
            (Some(input), Some(output)) => Some(Usage {
                input_tokens: input as u32,
                output_tokens: output as u32,
            }),
            _ => None,
        };

        Ok(ChatResponse { content, tool_calls, usage })
    }
}

impl LlmProvider for OpenAiChat {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let messages = Self::build_messages(&request);

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body.as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(max_tokens));
        }

        if let Some(temp) = request.temperature {
            body.as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }

        let parsed = self.send(body).await?;
        Self::parse_response(&parsed)
    }

    async fn chat_with_tools(
        &self,
        request: ChatRequest,
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        let messages = Self::build_messages(&request);

        let openai_tools: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "tools": openai_tools,
            "tool_choice": "auto",
        });

        if let Some(max_tokens) = request.max_tokens {
            body.as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(max_tokens));
        }

        if let Some(temp) = request.temperature {
            body.as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }

        let parsed = self.send(body).await?;
        Self::parse_response(&parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ion_core::types::ChatMessage;

    #[test]
    fn test_build_messages_tool_result() {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::text("system", "você é o ION"),
                ChatMessage::tool_result("call_9", "Transação criada."),
            ],
            max_tokens: None,
            temperature: None,
        };
        let built = OpenAiChat::build_messages(&request);
        assert_eq!(built[0]["role"], "system");
        assert_eq!(built[1]["role"], "tool");
        assert_eq!(built[1]["tool_call_id"], "call_9");
    }

    #[test]
    fn test_build_messages_encodes_arguments_as_string() {
        let request = ChatRequest {
            messages: vec![ChatMessage::assistant_tool_calls(vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "create_task".to_string(),
                arguments: json!({"titulo": "estudar"}),
            }])],
            max_tokens: None,
            temperature: None,
        };
        let built = OpenAiChat::build_messages(&request);
        let args = built[0]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        let roundtrip: serde_json::Value = serde_json::from_str(args).unwrap();
        assert_eq!(roundtrip["titulo"], "estudar");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "create_reminder",
                            "arguments": "{\"titulo\":\"remédio\",\"data\":\"amanhã às 9h\"}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20}
        });
        let response = OpenAiChat::parse_response(&raw).unwrap();
        assert!(response.content.is_empty());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "create_reminder");
        assert_eq!(response.tool_calls[0].arguments["titulo"], "remédio");
        assert_eq!(response.usage.as_ref().unwrap().output_tokens, 20);
    }

    #[test]
    fn test_parse_response_plain_text() {
        let raw = json!({
            "choices": [{"message": {"content": "Olá! Como posso ajudar?"}}]
        });
        let response = OpenAiChat::parse_response(&raw).unwrap();
        assert_eq!(response.content, "Olá! Como posso ajudar?");
        assert!(response.tool_calls.is_empty());
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_parse_response_malformed_arguments_fall_back_to_empty() {
        let raw = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "list_tasks", "arguments": "not json"}
                    }]
                }
            }]
        });
        let response = OpenAiChat::parse_response(&raw).unwrap();
        assert_eq!(response.tool_calls[0].arguments, json!({}));
    }
}
