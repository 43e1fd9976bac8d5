use std::sync::Arc;

use async_trait::async_trait;
use ion_core::types::{SavingsBox, ToolDefinition};
use ion_store::savings::Savings;
use serde_json::json;

use crate::tool::{Tool, ToolResult};

fn describe(savings_box: &SavingsBox) -> String {
    let mut line = format!(
        "{}: R$ {:.2} de R$ {:.2} ({:.0}%)",
        savings_box.nome,
        savings_box.valor_acumulado,
        savings_box.valor_objetivo,
        savings_box.progress() * 100.0
    );
    if savings_box.is_completed() {
        line.push_str(" — meta atingida!");
    }
    line
}

/// Tools for the `caixinha` (savings box) table.
pub struct SavingsTool {
    savings: Arc<Savings>,
    user_id: i64,
}

impl SavingsTool {
    pub fn new(savings: Arc<Savings>, user_id: i64) -> Self {
        Self { savings, user_id }
    }

    async fn handle_create(&self, args: &serde_json::Value) -> ToolResult {
        let nome = args["nome"].as_str().unwrap_or("").trim();
        if nome.is_empty() {
            return ToolResult::err("informe o nome da caixinha");
        }
        let Some(valor_objetivo) = args["valor_objetivo"].as_f64() else {
            return ToolResult::err("informe o valor objetivo da caixinha");
        };
        if valor_objetivo <= 0.0 {
            return ToolResult::err("o valor objetivo deve ser maior que zero");
        }
        let prazo = args["prazo"].as_str().filter(|p| !p.trim().is_empty());
        let categoria = args["categoria"].as_str().filter(|c| !c.trim().is_empty());

        match self
            .savings
            .create(self.user_id, nome, valor_objetivo, prazo, categoria)
            .await
        {
            Ok(savings_box) => ToolResult::ok(format!(
                "Caixinha criada: {} com objetivo de R$ {:.2}",
                savings_box.nome, savings_box.valor_objetivo
            )),
            Err(e) => {
                log!(" [savings] create failed: {e}");
                ToolResult::err("não consegui criar a caixinha, tente novamente")
            }
        }
    }

    async fn handle_deposit(&self, args: &serde_json::Value) -> ToolResult {
        let nome = args["nome"].as_str().unwrap_or("").trim();
        if nome.is_empty() {
            return ToolResult::err("informe em qual caixinha depositar");
        }
        let Some(valor) = args["valor"].as_f64() else {
            return ToolResult::err("informe o valor do depósito");
        };
        if valor <= 0.0 {
            return ToolResult::err("o valor do depósito deve ser maior que zero");
        }

        let matches = match self.savings.find_by_name(self.user_id, nome).await {
            Ok(m) => m,
            Err(e) => {
                log!(" [savings] find failed: {e}");
                return ToolResult::err("não consegui buscar as caixinhas");
            }
        };

        if matches.is_empty() {
            return ToolResult::ok(format!(
                "Não encontrei nenhuma caixinha chamada \"{nome}\". Quer que eu crie uma?"
            ));
        }
        if matches.len() > 1 {
            let names: Vec<&str> = matches.iter().map(|b| b.nome.as_str()).collect();
            return ToolResult::ok(format!(
                "Encontrei mais de uma caixinha parecida: {}. Em qual devo depositar?",
                names.join(", ")
            ));
        }

        match self.savings.deposit(&matches[0], valor).await {
            Ok(updated) => ToolResult::ok(format!(
                "Depósito de R$ {valor:.2} feito. {}",
                describe(&updated)
            )),
            Err(e) => {
                log!(" [savings] deposit failed: {e}");
                ToolResult::err("não consegui registrar o depósito, tente novamente")
            }
        }
    }

    async fn handle_list(&self) -> ToolResult {
        match self.savings.list(self.user_id).await {
            Ok(boxes) if boxes.is_empty() => {
                ToolResult::ok("Você ainda não tem nenhuma caixinha.")
            }
            Ok(boxes) => {
                let mut response = String::new();
                for b in &boxes {
                    response.push_str(&format!("- {}\n", describe(b)));
                }
                ToolResult::ok(response.trim_end().to_string())
            }
            Err(e) => {
                log!(" [savings] list failed: {e}");
                ToolResult::err("não consegui buscar as caixinhas")
            }
        }
    }
}

#[async_trait]
impl Tool for SavingsTool {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "create_savings_box".to_string(),
                description: "Cria uma caixinha (meta de economia) com valor objetivo.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "nome": { "type": "string", "description": "Nome da caixinha, ex: Viagem" },
                        "valor_objetivo": { "type": "number", "description": "Meta em reais" },
                        "prazo": { "type": "string", "description": "Prazo opcional, YYYY-MM-DD" },
                        "categoria": { "type": "string", "description": "Categoria opcional" }
                    },
                    "required": ["nome", "valor_objetivo"]
                }),
            },
            ToolDefinition {
                name: "add_deposit".to_string(),
                description: "Deposita um valor em uma caixinha existente.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "nome": { "type": "string", "description": "Nome (ou parte do nome) da caixinha" },
                        "valor": { "type": "number", "description": "Valor do depósito em reais" }
                    },
                    "required": ["nome", "valor"]
                }),
            },
            ToolDefinition {
                name: "list_savings_boxes".to_string(),
                description: "Lista as caixinhas do usuário com o progresso de cada uma.".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "create_savings_box" => self.handle_create(args).await,
            "add_deposit" => self.handle_deposit(args).await,
            "list_savings_boxes" => self.handle_list().await,
            _ => ToolResult::err(format!("ferramenta desconhecida: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_marks_completed() {
        let done = SavingsBox {
            id: 1,
            user_id: 1,
            nome: "Viagem".to_string(),
            valor_objetivo: 100.0,
            valor_acumulado: 120.0,
            ultimo_deposito: Some(20.0),
            prazo: None,
            categoria: None,
        };
        assert!(describe(&done).contains("meta atingida"));

        let pending = SavingsBox { valor_acumulado: 50.0, ..done };
        assert!(!describe(&pending).contains("meta atingida"));
    }
}
