use serde::{Deserialize, Serialize};

/// Generate a ULID-like ID using timestamp + random bytes.
/// Uses only std — no external ULID crate needed.
pub fn new_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let random: u64 = {
        let mut buf = [0u8; 8];
        if let Ok(mut f) = std::fs::File::open("/dev/urandom") {
            use std::io::Read;
            let _ = f.read_exact(&mut buf);
        } else {
            buf = ts.to_le_bytes();
        }
        u64::from_le_bytes(buf)
    };

    format!("{ts:012x}{random:016x}")
}

/// Unix epoch timestamp in seconds.
pub fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

// ─── Chat plumbing ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Tool calls made by the assistant (non-empty when role="assistant" and the LLM wants tools).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// The tool call ID this message is a result for (set when role="tool").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a plain text message (no tool calls).
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: String::new(),
            tool_calls,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<Usage>,
}

/// Definition of a tool that can be called by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

// ─── Domain entities (Supabase wire shapes) ──────────────────────────
//
// Field names match the BaaS columns, Portuguese included — these structs
// ARE the wire contract, so no serde renames.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub descricao: String,
    pub valor: f64,
    /// "entrada" or "saida".
    pub tipo: String,
    /// ISO date, YYYY-MM-DD.
    pub data: String,
    #[serde(default)]
    pub categoria_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub nome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub titulo: String,
    #[serde(default)]
    pub categoria: Option<String>,
    /// "pendente" or "concluido".
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub titulo: String,
    /// ISO local timestamp, YYYY-MM-DDTHH:MM:SS.
    pub data_para_lembrar: String,
    /// "Unico", "Diario", "Semanal" or "Mensal".
    pub recorrencia: String,
    #[serde(default)]
    pub telefone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: i64,
    pub user_id: i64,
    pub nome: String,
    pub categoria: String,
    /// "pendente" or "comprado".
    pub status: String,
    /// Named list this item belongs to, if any.
    #[serde(default)]
    pub selecao: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsBox {
    pub id: i64,
    pub user_id: i64,
    pub nome: String,
    pub valor_objetivo: f64,
    pub valor_acumulado: f64,
    #[serde(default)]
    pub ultimo_deposito: Option<f64>,
    #[serde(default)]
    pub prazo: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
}

impl SavingsBox {
    /// Completion is derived, never stored.
    pub fn is_completed(&self) -> bool {
        self.valor_acumulado >= self.valor_objetivo
    }

    /// Progress toward the goal in [0.0, 1.0].
    pub fn progress(&self) -> f64 {
        if self.valor_objetivo <= 0.0 {
            return 1.0;
        }
        (self.valor_acumulado / self.valor_objetivo).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn savings_box(accumulated: f64, goal: f64) -> SavingsBox {
        SavingsBox {
            id: 1,
            user_id: 1,
            nome: "Viagem".to_string(),
            valor_objetivo: goal,
            valor_acumulado: accumulated,
            ultimo_deposito: None,
            prazo: None,
            categoria: None,
        }
    }

    #[test]
    fn test_savings_completion_is_derived() {
        assert!(!savings_box(50.0, 100.0).is_completed());
        assert!(savings_box(100.0, 100.0).is_completed());
        assert!(savings_box(120.0, 100.0).is_completed());
    }

    #[test]
    fn test_deposit_never_decreases_progress() {
        let before = savings_box(30.0, 100.0);
        let mut after = before.clone();
        after.valor_acumulado += 25.0;
        assert!(after.progress() >= before.progress());
        assert!(!before.is_completed() || after.is_completed());
    }

    #[test]
    fn test_progress_caps_at_one() {
        assert_eq!(savings_box(250.0, 100.0).progress(), 1.0);
        assert_eq!(savings_box(10.0, 0.0).progress(), 1.0);
    }

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::text("user", "oi");
        assert_eq!(msg.role, "user");
        assert!(msg.tool_calls.is_empty());

        let result = ChatMessage::tool_result("call_1", "feito");
        assert_eq!(result.role, "tool");
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_new_id_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
