use std::sync::Arc;

use ion_core::error::Result;
use ion_core::types::ShoppingItem;
use serde_json::json;

use crate::SupabaseClient;

const TABLE: &str = "lista_de_compras";

const PLACEHOLDER_PREFIX: &str = "__LISTA_PLACEHOLDER_";
const PLACEHOLDER_SUFFIX: &str = "__";

/// The sentinel item name that represents the existence of a named list.
pub fn placeholder_name(list: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{list}{PLACEHOLDER_SUFFIX}")
}

/// Extract the list name from a placeholder item name, if it is one.
pub fn parse_placeholder(nome: &str) -> Option<&str> {
    nome.strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix(PLACEHOLDER_SUFFIX)
}

/// Adapter for the `lista_de_compras` table.
///
/// Named lists have no table of their own: a list exists if a placeholder
/// item carries its name, or if any real item still references it via
/// `selecao`. `list_names` unions both so a deleted placeholder cannot
/// orphan a list that still has items.
pub struct Shopping {
    supabase: Arc<SupabaseClient>,
}

impl Shopping {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create_item(
        &self,
        user_id: i64,
        nome: &str,
        categoria: &str,
        selecao: Option<&str>,
    ) -> Result<ShoppingItem> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "nome": nome,
                    "categoria": categoria,
                    "status": "pendente",
                    "selecao": selecao,
                }),
            )
            .await
    }

    /// Materialize a named list by inserting its placeholder row.
    pub async fn create_list(&self, user_id: i64, list: &str) -> Result<ShoppingItem> {
        self.supabase
            .insert(
                TABLE,
                &json!({
                    "user_id": user_id,
                    "nome": placeholder_name(list),
                    "categoria": "Outros",
                    "status": "pendente",
                    "selecao": list,
                }),
            )
            .await
    }

    /// List real items (placeholders filtered out), optionally scoped to one
    /// named list.
    pub async fn list_items(
        &self,
        user_id: i64,
        selecao: Option<&str>,
    ) -> Result<Vec<ShoppingItem>> {
        let mut filters = vec![("user_id", format!("eq.{user_id}"))];
        if let Some(list) = selecao {
            filters.push(("selecao", format!("eq.{list}")));
        }
        let rows: Vec<ShoppingItem> = self.supabase.select(TABLE, &filters).await?;
        Ok(rows
            .into_iter()
            .filter(|item| parse_placeholder(&item.nome).is_none())
            .collect())
    }

    /// Names of the user's lists: placeholders plus the distinct `selecao`
    /// values of real items.
    pub async fn list_names(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<ShoppingItem> = self
            .supabase
            .select(TABLE, &[("user_id", format!("eq.{user_id}"))])
            .await?;
        Ok(collect_list_names(&rows))
    }

    pub async fn set_status(&self, id: i64, status: &str) -> Result<Option<ShoppingItem>> {
        let mut rows: Vec<ShoppingItem> = self
            .supabase
            .update(
                TABLE,
                &[("id", format!("eq.{id}"))],
                &json!({ "status": status }),
            )
            .await?;
        Ok(rows.pop())
    }
}

/// Union of placeholder names and real items' selecao values, first-seen order.
pub fn collect_list_names(items: &[ShoppingItem]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in items {
        let name = match parse_placeholder(&item.nome) {
            Some(list) => Some(list.to_string()),
            None => item.selecao.clone(),
        };
        if let Some(name) = name {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(nome: &str, selecao: Option<&str>) -> ShoppingItem {
        ShoppingItem {
            id: 0,
            user_id: 1,
            nome: nome.to_string(),
            categoria: "Outros".to_string(),
            status: "pendente".to_string(),
            selecao: selecao.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_placeholder_roundtrip() {
        let nome = placeholder_name("Churrasco");
        assert_eq!(parse_placeholder(&nome), Some("Churrasco"));
        assert_eq!(parse_placeholder("Arroz"), None);
    }

    #[test]
    fn test_collect_names_unions_placeholders_and_items() {
        let items = vec![
            item(&placeholder_name("Churrasco"), Some("Churrasco")),
            item("Arroz", Some("Mercado")),
            item("Feijão", Some("Mercado")),
            item("Pilha", None),
        ];
        assert_eq!(collect_list_names(&items), vec!["Churrasco", "Mercado"]);
    }

    #[test]
    fn test_list_survives_deleted_placeholder() {
        // Placeholder removed, one real item remains: the list must still
        // resolve by name.
        let items = vec![item("Carvão", Some("Churrasco"))];
        assert_eq!(collect_list_names(&items), vec!["Churrasco"]);
    }
}
