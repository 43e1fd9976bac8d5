use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::Category;
use serde_json::json;

use crate::SupabaseClient;

// Table name carries the source system's typo; it is the wire contract.
const TABLE: &str = "categoria_trasacoes";

/// Adapter for the transaction-category table.
pub struct Categories {
    supabase: Arc<SupabaseClient>,
}

impl Categories {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// List all categories for a user.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Category>> {
        self.supabase
            .select(TABLE, &[("user_id", format!("eq.{user_id}"))])
            .await
    }

    /// Return the category named `nome` for this user, creating it if absent.
    ///
    /// Idempotent: the select runs first, so repeated calls with the same
    /// (user, name) yield the same row and never a duplicate.
    pub async fn get_or_create(&self, user_id: i64, nome: &str) -> Result<Category> {
        let mut rows: Vec<Category> = self
            .supabase
            .select(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("nome", format!("eq.{nome}")),
                ],
            )
            .await?;

        if let Some(existing) = rows.pop() {
            return Ok(existing);
        }

        self.supabase
            .insert(TABLE, &json!({ "user_id": user_id, "nome": nome }))
            .await
    }
}
