use std::sync::Arc;

use async_trait::async_trait;
use ion_core::types::{now_unix, ToolDefinition};
use ion_store::categories::Categories;
use ion_store::transactions::{self, Transactions};
use serde_json::json;

use crate::service::datetime::format_date_local;
use crate::tool::{Tool, ToolResult};

/// Income keywords; anything else is an expense.
const INCOME_KEYWORDS: [&str; 9] = [
    "salário", "salario", "recebi", "ganhei", "pagamento", "depósito", "deposito", "renda",
    "venda",
];

/// Infer "entrada"/"saida" from the description when the model omits it.
pub fn infer_tipo(descricao: &str) -> &'static str {
    let lower = descricao.to_lowercase();
    if INCOME_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "entrada"
    } else {
        "saida"
    }
}

/// Infer a category from the description when the model omits it.
pub fn infer_categoria(descricao: &str, tipo: &str) -> &'static str {
    let lower = descricao.to_lowercase();

    const FOOD: [&str; 10] = [
        "almoço", "almoco", "jantar", "comida", "mercado", "restaurante", "lanche", "café",
        "cafe", "pizza",
    ];
    const TRANSPORT: [&str; 7] = [
        "uber", "gasolina", "ônibus", "onibus", "combustível", "combustivel", "táxi",
    ];
    const HEALTH: [&str; 6] = ["médico", "medico", "farmácia", "farmacia", "remédio", "consulta"];
    const HOUSING: [&str; 6] = ["aluguel", "luz", "água", "agua", "internet", "condomínio"];
    const LEISURE: [&str; 5] = ["cinema", "show", "viagem", "jogo", "streaming"];

    if tipo == "entrada" {
        return "Salário";
    }
    if FOOD.iter().any(|k| lower.contains(k)) {
        "Alimentação"
    } else if TRANSPORT.iter().any(|k| lower.contains(k)) {
        "Transporte"
    } else if HEALTH.iter().any(|k| lower.contains(k)) {
        "Saúde"
    } else if HOUSING.iter().any(|k| lower.contains(k)) {
        "Moradia"
    } else if LEISURE.iter().any(|k| lower.contains(k)) {
        "Lazer"
    } else {
        "Outros"
    }
}

/// Tools for the `transacoes` table: record and list financial movements.
pub struct FinanceTool {
    transactions: Arc<Transactions>,
    categories: Arc<Categories>,
    user_id: i64,
    tz_offset: i32,
}

impl FinanceTool {
    pub fn new(
        transactions: Arc<Transactions>,
        categories: Arc<Categories>,
        user_id: i64,
        tz_offset: i32,
    ) -> Self {
        Self {
            transactions,
            categories,
            user_id,
            tz_offset,
        }
    }

    async fn handle_create(&self, args: &serde_json::Value) -> ToolResult {
        let descricao = args["descricao"].as_str().unwrap_or("").trim();
        if descricao.is_empty() {
            return ToolResult::err("informe a descrição da transação");
        }
        let Some(valor) = args["valor"].as_f64() else {
            return ToolResult::err("informe o valor da transação");
        };
        if valor <= 0.0 {
            return ToolResult::err("o valor deve ser maior que zero");
        }

        let tipo = match args["tipo"].as_str() {
            Some("entrada") | Some("income") => "entrada",
            Some("saida") | Some("saída") | Some("expense") => "saida",
            _ => infer_tipo(descricao),
        };
        let categoria = match args["categoria"].as_str() {
            Some(c) if !c.trim().is_empty() => c.trim().to_string(),
            _ => infer_categoria(descricao, tipo).to_string(),
        };
        let data = match args["data"].as_str() {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => format_date_local(now_unix(), self.tz_offset),
        };

        // Two independent round trips; no rollback if the second fails.
        let category = match self.categories.get_or_create(self.user_id, &categoria).await {
            Ok(c) => c,
            Err(e) => {
                log!(" [finance] get_or_create category failed: {e}");
                return ToolResult::err("não consegui salvar a categoria, tente novamente");
            }
        };

        match self
            .transactions
            .create(self.user_id, descricao, valor, tipo, &data, Some(category.id))
            .await
        {
            Ok(t) => ToolResult::ok(format!(
                "Transação registrada: {} — R$ {:.2} ({}, {categoria}) em {}",
                t.descricao, t.valor, t.tipo, t.data
            )),
            Err(e) => {
                log!(" [finance] create failed: {e}");
                ToolResult::err("não consegui registrar a transação, tente novamente")
            }
        }
    }

    async fn handle_list(&self, args: &serde_json::Value) -> ToolResult {
        let all = match self.transactions.list(self.user_id).await {
            Ok(t) => t,
            Err(e) => {
                log!(" [finance] list failed: {e}");
                return ToolResult::err("não consegui buscar as transações");
            }
        };

        let inicio = args["inicio"].as_str();
        let fim = args["fim"].as_str();
        let selected: Vec<&ion_core::types::Transaction> = match (inicio, fim) {
            (Some(from), Some(to)) => transactions::filter_period(&all, from, to),
            _ => all.iter().collect(),
        };

        if selected.is_empty() {
            return ToolResult::ok("Nenhuma transação encontrada.");
        }

        let mut response = String::new();
        for t in &selected {
            response.push_str(&format!(
                "- {} | {} | R$ {:.2} | {}\n",
                t.data, t.descricao, t.valor, t.tipo
            ));
        }
        let (entradas, saidas, saldo) = transactions::totals(selected.iter().copied());
        response.push_str(&format!(
            "Entradas: R$ {entradas:.2} | Saídas: R$ {saidas:.2} | Saldo: R$ {saldo:.2}"
        ));
        ToolResult::ok(response)
    }
}

#[async_trait]
impl Tool for FinanceTool {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "create_transaction".to_string(),
                description: "Registra uma transação financeira (gasto ou receita) do usuário."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "descricao": { "type": "string", "description": "Descrição da transação, ex: Almoço" },
                        "valor": { "type": "number", "description": "Valor em reais" },
                        "tipo": { "type": "string", "enum": ["entrada", "saida"], "description": "Tipo do movimento; se omitido é inferido da descrição" },
                        "categoria": { "type": "string", "description": "Categoria, ex: Alimentação; se omitida é inferida" },
                        "data": { "type": "string", "description": "Data no formato YYYY-MM-DD; padrão hoje" }
                    },
                    "required": ["descricao", "valor"]
                }),
            },
            ToolDefinition {
                name: "list_transactions".to_string(),
                description: "Lista as transações do usuário, com totais. Aceita um período opcional."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "inicio": { "type": "string", "description": "Início do período, YYYY-MM-DD" },
                        "fim": { "type": "string", "description": "Fim do período, YYYY-MM-DD" }
                    }
                }),
            },
        ]
    }

    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "create_transaction" => self.handle_create(args).await,
            "list_transactions" => self.handle_list(args).await,
            _ => ToolResult::err(format!("ferramenta desconhecida: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_tipo_defaults_to_saida() {
        assert_eq!(infer_tipo("Almoço"), "saida");
        assert_eq!(infer_tipo("Uber para o trabalho"), "saida");
    }

    #[test]
    fn test_infer_tipo_income_keywords() {
        assert_eq!(infer_tipo("Salário de agosto"), "entrada");
        assert_eq!(infer_tipo("recebi do freela"), "entrada");
    }

    #[test]
    fn test_infer_categoria_scenarios() {
        // The canonical scenario: "Almoço" with no tipo/categoria.
        assert_eq!(infer_tipo("Almoço"), "saida");
        assert_eq!(infer_categoria("Almoço", "saida"), "Alimentação");

        assert_eq!(infer_categoria("gasolina do carro", "saida"), "Transporte");
        assert_eq!(infer_categoria("consulta de rotina", "saida"), "Saúde");
        assert_eq!(infer_categoria("aluguel", "saida"), "Moradia");
        assert_eq!(infer_categoria("cinema com amigos", "saida"), "Lazer");
        assert_eq!(infer_categoria("presente", "saida"), "Outros");
        assert_eq!(infer_categoria("Salário", "entrada"), "Salário");
    }
}
