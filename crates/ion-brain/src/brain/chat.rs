use std::time::Duration;

use ion_core::error::Result;
use ion_core::types::*;
use ion_llm::provider::LlmProvider;
use tokio::sync::mpsc;

use crate::service::datetime::format_now_with_tz;
use crate::tool::ToolRegistry;

/// Hard cap on tool-calling rounds per user message.
pub(crate) const MAX_ITERATIONS: usize = 5;

/// Returned when the cap is exhausted without a final text answer.
pub(crate) const FALLBACK_REPLY: &str =
    "Desculpe, não consegui concluir sua solicitação agora. Pode tentar de novo?";

/// Build the system prompt: persona, current local datetime, and the
/// instruction to actually invoke tools instead of narrating intent.
pub(crate) fn build_system_prompt(now: i64, tz_offset: i32) -> ChatMessage {
    let (now_str, tz_str) = format_now_with_tz(now, tz_offset);
    ChatMessage::text(
        "system",
        format!(
            "Você é o ION, um assistente pessoal. Você ajuda com finanças, \
             tarefas, lembretes, listas de compras e caixinhas de economia.\n\
             Data e hora atual: {now_str} (UTC{tz_str})\n\n\
             Regras:\n\
             - Quando o usuário pedir uma ação, você DEVE invocar a ferramenta \
             correspondente. Nunca diga que vai fazer algo sem chamar a ferramenta.\n\
             - Se uma ferramenta devolver uma pergunta de esclarecimento, \
             repasse-a ao usuário e aguarde a resposta.\n\
             - Responda sempre em português do Brasil, de forma breve e amigável."
        ),
    )
}

/// The function-calling loop.
///
/// Calls the completions endpoint with the full message list and tool
/// schema; while the model requests tool calls, executes them all
/// concurrently (results keep call order), appends one tool-result message
/// per call, and continues. A plain-text response is final. Exhausting the
/// cap yields the apology fallback, never an error.
///
/// Returns the final text and how many tool calls were executed.
pub(crate) async fn run_tool_loop<P: LlmProvider>(
    llm: &P,
    tools: &ToolRegistry,
    messages: &mut Vec<ChatMessage>,
) -> Result<(String, usize)> {
    let definitions = tools.definitions();
    let mut executed = 0usize;

    for iteration in 0..MAX_ITERATIONS {
        log!(" [chat] iteration {}/{MAX_ITERATIONS}", iteration + 1);

        let request = ChatRequest {
            messages: messages.clone(),
            max_tokens: Some(1024),
            temperature: Some(0.7),
        };

        let response = llm.chat_with_tools(request, &definitions).await?;

        if response.tool_calls.is_empty() {
            return Ok((response.content, executed));
        }

        let mut assistant = ChatMessage::assistant_tool_calls(response.tool_calls.clone());
        if !response.content.is_empty() {
            assistant.content = response.content.clone();
        }
        messages.push(assistant);

        let pending: Vec<_> = response
            .tool_calls
            .iter()
            .map(|tc| tools.execute(&tc.name, &tc.arguments))
            .collect();
        let results = futures::future::join_all(pending).await;
        executed += results.len();

        for (tool_call, result) in response.tool_calls.iter().zip(results) {
            log!(" [tool] {} → {} chars", tool_call.name, result.output.len());
            messages.push(ChatMessage::tool_result(&tool_call.id, &result.output));
        }
    }

    log!(" [chat] iteration cap reached, returning fallback");
    Ok((FALLBACK_REPLY.to_string(), executed))
}

/// Delay applied after emitting a character: whitespace flows fast,
/// sentence-ending punctuation pauses.
pub(crate) fn char_delay(c: char) -> Duration {
    if c.is_whitespace() {
        Duration::from_millis(5)
    } else if matches!(c, '.' | '!' | '?') {
        Duration::from_millis(120)
    } else {
        Duration::from_millis(20)
    }
}

/// Re-emit `text` character by character through the channel, simulating
/// streaming without a streaming transport. Stops silently if the receiver
/// is gone.
pub(crate) async fn stream_text(text: &str, tx: &mpsc::UnboundedSender<String>) {
    for c in text.chars() {
        if tx.send(c.to_string()).is_err() {
            return;
        }
        tokio::time::sleep(char_delay(c)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::tool::{Tool, ToolResult};

    /// Pops scripted responses; when the script is empty, keeps requesting
    /// the same tool call forever. Records every request it receives.
    struct ScriptedLlm {
        script: Mutex<VecDeque<ChatResponse>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(script: Vec<ChatResponse>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn endless_tool_calls() -> Self {
            Self::new(Vec::new())
        }
    }

    fn text_response(content: &str) -> ChatResponse {
        ChatResponse {
            content: content.to_string(),
            tool_calls: vec![],
            usage: None,
        }
    }

    fn tool_call(id: &str, value: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: "echo".to_string(),
            arguments: json!({ "value": value }),
        }
    }

    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, request: ChatRequest) -> ion_core::error::Result<ChatResponse> {
            self.requests.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| ChatResponse {
                content: String::new(),
                tool_calls: vec![tool_call("call_loop", "again")],
                usage: None,
            }))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "echo".to_string(),
                description: "echoes".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            }]
        }

        async fn execute(&self, _name: &str, args: &serde_json::Value) -> ToolResult {
            ToolResult::ok(format!("echo: {}", args["value"].as_str().unwrap_or("")))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![Box::new(EchoTool)])
    }

    fn seed_messages() -> Vec<ChatMessage> {
        vec![
            build_system_prompt(1_700_000_000, -3),
            ChatMessage::text("user", "faça alguma coisa"),
        ]
    }

    #[tokio::test]
    async fn test_plain_text_is_final() {
        let llm = ScriptedLlm::new(vec![text_response("Oi! Tudo certo.")]);
        let tools = registry();
        let mut messages = seed_messages();

        let (reply, executed) = run_tool_loop(&llm, &tools, &mut messages).await.unwrap();
        assert_eq!(reply, "Oi! Tudo certo.");
        assert_eq!(executed, 0);
        assert_eq!(llm.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_loop_terminates_at_cap_with_fallback() {
        let llm = ScriptedLlm::endless_tool_calls();
        let tools = registry();
        let mut messages = seed_messages();

        let (reply, executed) = run_tool_loop(&llm, &tools, &mut messages).await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
        assert!(!reply.is_empty());
        assert_eq!(executed, MAX_ITERATIONS);
        assert_eq!(llm.requests.lock().unwrap().len(), MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_tool_results_keep_call_order() {
        let llm = ScriptedLlm::new(vec![
            ChatResponse {
                content: String::new(),
                tool_calls: vec![tool_call("call_a", "primeiro"), tool_call("call_b", "segundo")],
                usage: None,
            },
            text_response("feito"),
        ]);
        let tools = registry();
        let mut messages = seed_messages();

        let (reply, executed) = run_tool_loop(&llm, &tools, &mut messages).await.unwrap();
        assert_eq!(reply, "feito");
        assert_eq!(executed, 2);

        // The second request must carry the tool results in call order.
        let requests = llm.requests.lock().unwrap();
        let second = &requests[1].messages;
        let tool_messages: Vec<&ChatMessage> =
            second.iter().filter(|m| m.role == "tool").collect();
        assert_eq!(tool_messages.len(), 2);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(tool_messages[0].content, "echo: primeiro");
        assert_eq!(tool_messages[1].tool_call_id.as_deref(), Some("call_b"));
        assert_eq!(tool_messages[1].content, "echo: segundo");
    }

    #[test]
    fn test_char_delay_ordering() {
        assert!(char_delay(' ') < char_delay('a'));
        assert!(char_delay('a') < char_delay('.'));
        assert!(char_delay('!') == char_delay('?'));
    }

    #[tokio::test]
    async fn test_stream_text_preserves_content() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let text = "Oi! Td bem?";
        stream_text(text, &tx).await;
        drop(tx);

        let mut collected = String::new();
        while let Some(chunk) = rx.recv().await {
            collected.push_str(&chunk);
        }
        assert_eq!(collected, text);
    }
}
