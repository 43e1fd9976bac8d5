use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::Reminder;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "lembretes";

/// Adapter for the `lembretes` table.
pub struct Reminders {
    supabase: Arc<SupabaseClient>,
}

impl Reminders {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(
        &self,
        user_id: i64,
        titulo: &str,
        data_para_lembrar: &str,
        recorrencia: &str,
        telefone: Option<&str>,
    ) -> Result<Reminder> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "titulo": titulo,
                    "data_para_lembrar": data_para_lembrar,
                    "recorrencia": recorrencia,
                    "telefone": telefone,
                }),
            )
            .await
    }

    /// List reminders at or after `now_iso`, soonest first.
    pub async fn list_upcoming(&self, user_id: i64, now_iso: &str) -> Result<Vec<Reminder>> {
        self.supabase
            .select(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("data_para_lembrar", format!("gte.{now_iso}")),
                    ("order", "data_para_lembrar.asc".to_string()),
                ],
            )
            .await
    }
}
