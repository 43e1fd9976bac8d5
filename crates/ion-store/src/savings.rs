use std::sync::Arc;

use ion_core::error::{IonError, Result};
use ion_core::types::SavingsBox;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "caixinha";

/// Adapter for the `caixinha` (savings box) table.
pub struct Savings {
    supabase: Arc<SupabaseClient>,
}

impl Savings {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(
        &self,
        user_id: i64,
        nome: &str,
        valor_objetivo: f64,
        prazo: Option<&str>,
        categoria: Option<&str>,
    ) -> Result<SavingsBox> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "nome": nome,
                    "valor_objetivo": valor_objetivo,
                    "valor_acumulado": 0.0,
                    "prazo": prazo,
                    "categoria": categoria,
                }),
            )
            .await
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<SavingsBox>> {
        self.supabase
            .select(TABLE, &[("user_id", format!("eq.{user_id}"))])
            .await
    }

    /// Find boxes whose name contains `query` (case-insensitive).
    pub async fn find_by_name(&self, user_id: i64, query: &str) -> Result<Vec<SavingsBox>> {
        self.supabase
            .select(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("nome", format!("ilike.*{query}*")),
                ],
            )
            .await
    }

    /// Add a deposit. The accumulated amount only ever grows; non-positive
    /// amounts are rejected before any round trip.
    pub async fn deposit(&self, savings_box: &SavingsBox, amount: f64) -> Result<SavingsBox> {
        if amount <= 0.0 {
            return Err(IonError::Store(format!(
                "deposit must be positive, got {amount}"
            )));
        }

        let mut rows: Vec<SavingsBox> = self
            .supabase
            .update(
                TABLE,
                &[("id", format!("eq.{}", savings_box.id))],
                &json!({
                    "valor_acumulado": savings_box.valor_acumulado + amount,
                    "ultimo_deposito": amount,
                }),
            )
            .await?;

        rows.pop()
            .ok_or_else(|| IonError::Store(format!("savings box {} not found", savings_box.id)))
    }
}
