use std::sync::Arc;

use async_trait::async_trait;
use ion_core::types::ToolDefinition;
use ion_store::todos::Todos;
use serde_json::json;

use crate::tool::{Tool, ToolResult};

/// Tools for the `to_do` table.
pub struct TaskTool {
    todos: Arc<Todos>,
    user_id: i64,
}

impl TaskTool {
    pub fn new(todos: Arc<Todos>, user_id: i64) -> Self {
        Self { todos, user_id }
    }

    async fn handle_create(&self, args: &serde_json::Value) -> ToolResult {
        let titulo = args["titulo"].as_str().unwrap_or("").trim();
        if titulo.is_empty() {
            return ToolResult::err("informe o título da tarefa");
        }
        let categoria = args["categoria"].as_str().filter(|c| !c.trim().is_empty());

        match self.todos.create(self.user_id, titulo, categoria).await {
            Ok(todo) => {
                let mut response = format!("Tarefa criada: {}", todo.titulo);
                if let Some(cat) = &todo.categoria {
                    response.push_str(&format!(" ({cat})"));
                }
                ToolResult::ok(response)
            }
            Err(e) => {
                log!(" [task] create failed: {e}");
                ToolResult::err("não consegui criar a tarefa, tente novamente")
            }
        }
    }

    async fn handle_list(&self, args: &serde_json::Value) -> ToolResult {
        let status_filter = args["status"].as_str().and_then(|s| {
            let lower = s.to_lowercase();
            if lower.contains("conclu") || lower.contains("done") {
                Some("concluido")
            } else if lower.contains("pend") || lower.contains("todo") {
                Some("pendente")
            } else {
                None
            }
        });

        let todos = match self.todos.list(self.user_id).await {
            Ok(t) => t,
            Err(e) => {
                log!(" [task] list failed: {e}");
                return ToolResult::err("não consegui buscar as tarefas");
            }
        };

        let selected: Vec<_> = todos
            .iter()
            .filter(|t| status_filter.map_or(true, |s| t.status == s))
            .collect();

        if selected.is_empty() {
            return ToolResult::ok("Nenhuma tarefa encontrada.");
        }

        let mut response = String::new();
        for todo in selected {
            let marker = if todo.status == "concluido" { "x" } else { " " };
            response.push_str(&format!("- [{marker}] {}", todo.titulo));
            if let Some(cat) = &todo.categoria {
                response.push_str(&format!(" ({cat})"));
            }
            response.push('\n');
        }
        ToolResult::ok(response.trim_end().to_string())
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "create_task".to_string(),
                description: "Cria uma tarefa (to-do) para o usuário.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "titulo": { "type": "string", "description": "Título da tarefa" },
                        "categoria": { "type": "string", "description": "Categoria opcional" }
                    },
                    "required": ["titulo"]
                }),
            },
            ToolDefinition {
                name: "list_tasks".to_string(),
                description: "Lista as tarefas do usuário. Aceita filtro por status (pendente ou concluido)."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "status": { "type": "string", "enum": ["pendente", "concluido"], "description": "Filtro opcional" }
                    }
                }),
            },
        ]
    }

    async fn execute(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        match name {
            "create_task" => self.handle_create(args).await,
            "list_tasks" => self.handle_list(args).await,
            _ => ToolResult::err(format!("ferramenta desconhecida: {name}")),
        }
    }
}
