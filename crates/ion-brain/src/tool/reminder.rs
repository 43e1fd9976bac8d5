use std::sync::Arc;

use async_trait::async_trait;
use ion_core::types::{now_unix, ToolDefinition};
use ion_llm::provider::LlmProvider;
use ion_store::reminders::Reminders;
use serde_json::json;

use crate::service::datetime::{
    advance_until_future, format_iso_local, resolve_reminder_time,
};
use crate::service::hours::suggest_hour;
use crate::service::prefs::{bucket_for, PrefsStore};
use crate::tool::{Tool, ToolResult};

const RECURRENCES: [&str; 4] = ["Unico", "Diario", "Semanal", "Mensal"];

fn normalize_recorrencia(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw else { return "Unico" };
    let lower = raw.trim().to_lowercase();
    for canonical in RECURRENCES {
        if lower == canonical.to_lowercase() {
            return canonical;
        }
    }
    match lower.as_str() {
        "diário" | "diaria" | "diária" | "daily" => "Diario",
        "weekly" => "Semanal",
        "monthly" => "Mensal",
        _ => "Unico",
    }
}

/// Tools for the `lembretes` table.
///
/// Date expressions resolve through the datetime service; when no explicit
/// time of day is given, the preferred-hours heuristic picks one.
pub struct ReminderTool<P: LlmProvider> {
    reminders: Arc<Reminders>,
    prefs: Arc<PrefsStore>,
    llm: Arc<P>,
    user_id: i64,
    tz_offset: i32,
}

impl<P: LlmProvider> ReminderTool<P> {
    pub fn new(
        reminders: Arc<Reminders>,
        prefs: Arc<PrefsStore>,
        llm: Arc<P>,
        user_id: i64,
        tz_offset: i32,
    ) -> Self {
        Self {
            reminders,
            prefs,
            llm,
            user_id,
            tz_offset,
        }
    }

    async fn handle_create(&self, args: &serde_json::Value) -> ToolResult {
        let titulo = args["titulo"].as_str().unwrap_or("").trim();
        if titulo.is_empty() {
            return ToolResult::err("informe o título do lembrete");
        }
        let data_expr = args["data"].as_str().unwrap_or("").trim();
        if data_expr.is_empty() {
            return ToolResult::err("informe a data do lembrete");
        }
        let recorrencia = normalize_recorrencia(args["recorrencia"].as_str());
        let telefone = args["telefone"].as_str().filter(|t| !t.trim().is_empty());

        let now = now_unix();
        let Some(resolved) = resolve_reminder_time(data_expr, recorrencia, now, self.tz_offset)
        else {
            return ToolResult::err(format!(
                "não consegui entender a data \"{data_expr}\". Tente algo como \"amanhã às 15h\" ou \"2026-08-20 09:00\""
            ));
        };

        let mut ts = resolved.ts;
        if !resolved.explicit_time {
            let hour = suggest_hour(&self.prefs, self.llm.as_ref(), titulo, now, self.tz_offset).await;
            ts = set_local_hour(ts, hour, self.tz_offset);
            ts = advance_until_future(ts, recorrencia, now, self.tz_offset);
        }

        let when = format_iso_local(ts, self.tz_offset);
        match self
            .reminders
            .create(self.user_id, titulo, &when, recorrencia, telefone)
            .await
        {
            Ok(reminder) => {
                if resolved.explicit_time {
                    let local_hour =
                        ((ts + (self.tz_offset as i64) * 3600).rem_euclid(86400) / 3600) as u8;
                    if let Err(e) = self.prefs.remember_hour(bucket_for(titulo), local_hour).await {
                        log!(" [reminder] failed to remember hour: {e}");
                    }
                }
                ToolResult::ok(format!(
                    "Lembrete criado: {} em {} ({})",
                    reminder.titulo, reminder.data_para_lembrar, reminder.recorrencia
                ))
            }
            Err(e) => {
                log!(" [reminder] create failed: {e}");
                ToolResult::err("não consegui criar o lembrete, tente novamente")
            }
        }
    }

    async fn handle_list(&self) -> ToolResult {
        let now_iso = format_iso_local(now_unix(), self.tz_offset);
        match self.reminders.list_upcoming(self.user_id, &now_iso).await {
            Ok(reminders) if reminders.is_empty() => {
                ToolResult::ok("Nenhum lembrete futuro encontrado.")
            }
            Ok(reminders) => {
                let mut response = String::new();
                for r in reminders {
                    response.push_str(&format!(
                        "- {} | {} | {}\n",
                        r.data_para_lembrar, r.titulo, r.recorrencia
                    ));
                }
                ToolResult::ok(response.trim_end().to_string())
            }
            Err(e) => {
                log!(" [reminder] list failed: {e}");
                ToolResult::err("não consegui buscar os lembretes")
            }
        }
    }
}

/// Replace the local hour of a timestamp, zeroing minutes.
fn set_local_hour(ts: i64, hour: u8, tz_offset: i32) -> i64 {
    let offset_secs = (tz_offset as i64) * 3600;
    let local = ts + offset_secs;
    let day_start = local.div_euclid(86400) * 86400;
    day_start + (hour as i64) * 3600 - offset_secs
}

#[async_trait]
impl<P: LlmProvider + 'static> Tool for ReminderTool<P> {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "create_reminder".to_string(),
                description: "Cria um lembrete com data futura. Aceita datas em linguagem natural (\"amanhã às 15h\") ou ISO."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "titulo": { "type": "string", "description": "O que lembrar" },
                        "data": { "type": "string", "description": "Quando lembrar, ex: \"amanhã às 15h\"" },
                        "recorrencia": { "type": "string", "enum": ["Unico", "Diario", "Semanal", "Mensal"], "description": "Padrão: Unico" },
                        "telefone": { "type": "string", "description": "Telefone opcional para notificação" }
                    },
                    "required": ["titulo", "data"]
                }),
            },
            ToolDefinition {
                name: "list_reminders".to_string(),
                description: "Lista os próximos lembretes do usuário.".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "create_reminder" => self.handle_create(args).await,
            "list_reminders" => self.handle_list().await,
            _ => ToolResult::err(format!("ferramenta desconhecida: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_recorrencia() {
        assert_eq!(normalize_recorrencia(None), "Unico");
        assert_eq!(normalize_recorrencia(Some("diario")), "Diario");
        assert_eq!(normalize_recorrencia(Some("Diário")), "Diario");
        assert_eq!(normalize_recorrencia(Some("SEMANAL")), "Semanal");
        assert_eq!(normalize_recorrencia(Some("qualquer")), "Unico");
    }

    #[test]
    fn test_set_local_hour() {
        use crate::service::datetime::{date_to_unix_days, format_iso_local};
        let tz = -3;
        let ts = date_to_unix_days(2026, 8, 7) * 86400 + 14 * 3600 - (tz as i64) * 3600;
        let moved = set_local_hour(ts, 9, tz);
        assert_eq!(format_iso_local(moved, tz), "2026-08-07T09:00:00");
    }
}
