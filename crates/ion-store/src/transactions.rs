use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::Transaction;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "transacoes";

/// Adapter for the `transacoes` table.
pub struct Transactions {
    supabase: Arc<SupabaseClient>,
}

impl Transactions {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(
        &self,
        user_id: i64,
        descricao: &str,
        valor: f64,
        tipo: &str,
        data: &str,
        categoria_id: Option<i64>,
    ) -> Result<Transaction> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "descricao": descricao,
                    "valor": valor,
                    "tipo": tipo,
                    "data": data,
                    "categoria_id": categoria_id,
                }),
            )
            .await
    }

    /// List a user's transactions, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Transaction>> {
        self.supabase
            .select(
                TABLE,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "data.desc".to_string()),
                ],
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let _: Vec<Transaction> = self
            .supabase
            .delete(TABLE, &[("id", format!("eq.{id}"))])
            .await?;
        Ok(())
    }
}

/// Keep only transactions with `from <= data <= to` (ISO dates compare
/// lexicographically).
pub fn filter_period<'a>(
    transactions: &'a [Transaction],
    from: &str,
    to: &str,
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|t| t.data.as_str() >= from && t.data.as_str() <= to)
        .collect()
}

/// Sum (entradas, saidas, saldo) for display.
pub fn totals<'a, I>(transactions: I) -> (f64, f64, f64)
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut entradas = 0.0;
    let mut saidas = 0.0;
    for t in transactions {
        if t.tipo == "entrada" {
            entradas += t.valor;
        } else {
            saidas += t.valor;
        }
    }
    (entradas, saidas, entradas - saidas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(descricao: &str, valor: f64, tipo: &str, data: &str) -> Transaction {
        Transaction {
            id: 0,
            user_id: 1,
            descricao: descricao.to_string(),
            valor,
            tipo: tipo.to_string(),
            data: data.to_string(),
            categoria_id: None,
        }
    }

    #[test]
    fn test_totals() {
        let transactions = vec![
            tx("Salário", 3000.0, "entrada", "2026-08-01"),
            tx("Almoço", 30.0, "saida", "2026-08-02"),
            tx("Mercado", 170.0, "saida", "2026-08-03"),
        ];
        let (entradas, saidas, saldo) = totals(&transactions);
        assert_eq!(entradas, 3000.0);
        assert_eq!(saidas, 200.0);
        assert_eq!(saldo, 2800.0);
    }

    #[test]
    fn test_totals_empty() {
        let empty: Vec<Transaction> = Vec::new();
        assert_eq!(totals(&empty), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_filter_period_inclusive() {
        let transactions = vec![
            tx("a", 1.0, "saida", "2026-07-31"),
            tx("b", 1.0, "saida", "2026-08-01"),
            tx("c", 1.0, "saida", "2026-08-15"),
            tx("d", 1.0, "saida", "2026-09-01"),
        ];
        let filtered = filter_period(&transactions, "2026-08-01", "2026-08-31");
        let names: Vec<&str> = filtered.iter().map(|t| t.descricao.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
