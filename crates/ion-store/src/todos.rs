use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::Todo;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "to_do";

/// Adapter for the `to_do` table.
pub struct Todos {
    supabase: Arc<SupabaseClient>,
}

impl Todos {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(&self, user_id: i64, titulo: &str, categoria: Option<&str>) -> Result<Todo> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "titulo": titulo,
                    "categoria": categoria,
                    "status": "pendente",
                }),
            )
            .await
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Todo>> {
        self.supabase
            .select(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await
    }

    /// Change a task's status. Completing stamps `completed_at`; reopening
    /// clears it.
    pub async fn set_status(&self, id: i64, status: &str, now_iso: &str) -> Result<Option<Todo>> {
        let body = if status == "concluido" {
            json!({ "status": status, "completed_at": now_iso })
        } else {
            json!({ "status": status, "completed_at": null })
        };
        let mut rows: Vec<Todo> = self
            .supabase
            .update(TABLE, &[("id", format!("eq.{id}"))], &body)
            .await?;
        Ok(rows.pop())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let _: Vec<Todo> = self
            .supabase
            .delete(TABLE, &[("id", format!("eq.{id}"))])
            .await?;
        Ok(())
    }

    /// Remove completed tasks whose `completed_at` is before `cutoff_iso`.
    /// Returns the number of purged rows. Called from the maintenance pass,
    /// never from a read path.
    pub async fn purge_completed(&self, user_id: i64, cutoff_iso: &str) -> Result<usize> {
        let purged: Vec<Todo> = self
            .supabase
            .delete(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("status", "eq.concluido".to_string()),
                    ("completed_at", format!("lt.{cutoff_iso}")),
                ],
            )
            .await?;
        Ok(purged.len())
    }
}
