use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::User;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "usuarios";

/// Adapter for the `usuarios` table.
pub struct Users {
    supabase: Arc<SupabaseClient>,
}

impl Users {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Register a new user.
    pub async fn create(
        &self,
        nome: &str,
        email: Option<&str>,
        telefone: Option<&str>,
    ) -> Result<User> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "nome": nome,
                    "email": email,
                    "telefone": telefone,
                    "status": "ativo",
                }),
            )
            .await
    }

    /// Look up a user by phone number (the login key).
    pub async fn find_by_phone(&self, telefone: &str) -> Result<Option<User>> {
        let mut rows: Vec<User> = self
            .supabase
            .select(TABLE, &[("telefone", format!("eq.{telefone}"))])
            .await?;
        Ok(rows.pop())
    }

    /// Apply profile edits. Only the provided fields are touched.
    pub async fn update_profile(&self, id: i64, changes: serde_json::Value) -> Result<Option<User>> {
        let mut rows: Vec<User> = self
            .supabase
            .update(TABLE, &[("id", format!("eq.{id}"))], &changes)
            .await?;
        Ok(rows.pop())
    }
}
