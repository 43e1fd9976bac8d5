use std::sync::Arc;

use async_trait::async_trait;
use ion_core::types::ToolDefinition;
use ion_store::shopping::Shopping;
use serde_json::json;

use crate::tool::{Tool, ToolResult};

/// Outcome of resolving which named list an item belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelecaoChoice {
    /// No named lists exist; the item goes to the default (unnamed) list.
    Default,
    /// Exactly one candidate — use it.
    Use(String),
    /// Multiple candidates and no hint: ask the user which one.
    AskWhich(Vec<String>),
}

/// Decide the target list given the user's known lists and the optional
/// `selecao` argument. Ambiguity is never auto-resolved.
pub fn resolve_selecao(known: &[String], requested: Option<&str>) -> SelecaoChoice {
    if let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) {
        let matched = known
            .iter()
            .find(|k| k.eq_ignore_ascii_case(requested))
            .cloned()
            .unwrap_or_else(|| requested.to_string());
        return SelecaoChoice::Use(matched);
    }

    match known.len() {
        0 => SelecaoChoice::Default,
        1 => SelecaoChoice::Use(known[0].clone()),
        _ => SelecaoChoice::AskWhich(known.to_vec()),
    }
}

/// Tools for the `lista_de_compras` table.
pub struct ShoppingTool {
    shopping: Arc<Shopping>,
    user_id: i64,
}

impl ShoppingTool {
    pub fn new(shopping: Arc<Shopping>, user_id: i64) -> Self {
        Self { shopping, user_id }
    }

    async fn handle_create(&self, args: &serde_json::Value) -> ToolResult {
        let nome = args["nome"].as_str().unwrap_or("").trim();
        if nome.is_empty() {
            return ToolResult::err("informe o nome do item");
        }
        let categoria = args["categoria"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Outros");

        let known = match self.shopping.list_names(self.user_id).await {
            Ok(names) => names,
            Err(e) => {
                log!(" [shopping] list_names failed: {e}");
                return ToolResult::err("não consegui verificar suas listas");
            }
        };

        let selecao = match resolve_selecao(&known, args["selecao"].as_str()) {
            SelecaoChoice::Default => None,
            SelecaoChoice::Use(list) => Some(list),
            SelecaoChoice::AskWhich(lists) => {
                // Clarifying question instead of a write.
                return ToolResult::ok(format!(
                    "Você tem mais de uma lista de compras: {}. Em qual delas devo adicionar \"{nome}\"?",
                    lists.join(", ")
                ));
            }
        };

        match self
            .shopping
            .create_item(self.user_id, nome, categoria, selecao.as_deref())
            .await
        {
            Ok(item) => {
                let mut response = format!("Item adicionado: {} ({categoria})", item.nome);
                if let Some(list) = &item.selecao {
                    response.push_str(&format!(" na lista {list}"));
                }
                ToolResult::ok(response)
            }
            Err(e) => {
                log!(" [shopping] create failed: {e}");
                ToolResult::err("não consegui adicionar o item, tente novamente")
            }
        }
    }

    async fn handle_list(&self, args: &serde_json::Value) -> ToolResult {
        let selecao = args["selecao"].as_str().map(str::trim).filter(|s| !s.is_empty());
        match self.shopping.list_items(self.user_id, selecao).await {
            Ok(items) if items.is_empty() => ToolResult::ok("A lista de compras está vazia."),
            Ok(items) => {
                let mut response = String::new();
                for item in items {
                    let marker = if item.status == "comprado" { "x" } else { " " };
                    response.push_str(&format!("- [{marker}] {} ({})", item.nome, item.categoria));
                    if let Some(list) = &item.selecao {
                        response.push_str(&format!(" — {list}"));
                    }
                    response.push('\n');
                }
                ToolResult::ok(response.trim_end().to_string())
            }
            Err(e) => {
                log!(" [shopping] list failed: {e}");
                ToolResult::err("não consegui buscar a lista de compras")
            }
        }
    }
}

#[async_trait]
impl Tool for ShoppingTool {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "create_shopping_item".to_string(),
                description: "Adiciona um item à lista de compras. Se o usuário tiver várias listas nomeadas, informe selecao."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "nome": { "type": "string", "description": "Nome do item, ex: Arroz" },
                        "categoria": { "type": "string", "description": "Categoria opcional; padrão Outros" },
                        "selecao": { "type": "string", "description": "Nome da lista, se o usuário tiver mais de uma" }
                    },
                    "required": ["nome"]
                }),
            },
            ToolDefinition {
                name: "list_shopping_items".to_string(),
                description: "Lista os itens de compras do usuário, opcionalmente de uma lista específica."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "selecao": { "type": "string", "description": "Nome da lista, opcional" }
                    }
                }),
            },
        ]
    }

    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "create_shopping_item" => self.handle_create(args).await,
            "list_shopping_items" => self.handle_list(args).await,
            _ => ToolResult::err(format!("ferramenta desconhecida: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_lists_no_hint_asks_which() {
        let known = lists(&["Mercado", "Churrasco"]);
        match resolve_selecao(&known, None) {
            SelecaoChoice::AskWhich(options) => {
                assert_eq!(options, known);
            }
            other => panic!("expected AskWhich, got {other:?}"),
        }
    }

    #[test]
    fn test_single_list_is_used() {
        let known = lists(&["Mercado"]);
        assert_eq!(
            resolve_selecao(&known, None),
            SelecaoChoice::Use("Mercado".to_string())
        );
    }

    #[test]
    fn test_no_lists_uses_default() {
        assert_eq!(resolve_selecao(&[], None), SelecaoChoice::Default);
    }

    #[test]
    fn test_explicit_hint_matches_case_insensitively() {
        let known = lists(&["Mercado", "Churrasco"]);
        assert_eq!(
            resolve_selecao(&known, Some("mercado")),
            SelecaoChoice::Use("Mercado".to_string())
        );
    }

    #[test]
    fn test_unknown_hint_is_kept_verbatim() {
        let known = lists(&["Mercado"]);
        assert_eq!(
            resolve_selecao(&known, Some("Farmácia")),
            SelecaoChoice::Use("Farmácia".to_string())
        );
    }
}
