use std::collections::HashMap;
use std::sync::Arc;

use ion_core::config::Config;
use ion_core::error::{user_facing_message, IonError, Result};
use ion_core::types::{now_unix, ChatMessage, ShoppingItem, Todo, User};
use ion_llm::assistants::AssistantsClient;
use ion_llm::files::FilesClient;
use ion_llm::openai::OpenAiChat;
use ion_llm::transcribe::AudioClient;
use ion_store::categories::Categories;
use ion_store::reminders::Reminders;
use ion_store::savings::Savings;
use ion_store::shopping::Shopping;
use ion_store::todos::Todos;
use ion_store::transactions::Transactions;
use ion_store::users::Users;
use ion_store::SupabaseClient;
use tokio::sync::mpsc;

use crate::service::csv::{self, TransactionRecord};
use crate::service::datetime::{format_date_local, format_iso_local};
use crate::service::prefs::PrefsStore;
use crate::tool::finance::FinanceTool;
use crate::tool::reminder::ReminderTool;
use crate::tool::savings::SavingsTool;
use crate::tool::shopping::ShoppingTool;
use crate::tool::task::TaskTool;
use crate::tool::ToolRegistry;

mod chat;
pub mod ingest;

use chat::{build_system_prompt, run_tool_loop, stream_text};
use ingest::claims_unfulfilled_tool_use;

const CORRECTIVE_PROMPT: &str =
    "Você disse que iria usar uma ferramenta, mas nenhuma foi invocada. \
     Invoque a ferramenta necessária agora.";

/// The orchestrator: owns the LLM clients, the tool registry, the
/// persistence adapters and the local prefs store. Everything is
/// constructed here and injected — no globals.
pub struct Brain {
    pub(crate) config: Config,
    pub(crate) llm: Arc<OpenAiChat>,
    pub(crate) tools: ToolRegistry,
    pub(crate) files: FilesClient,
    pub(crate) assistants: AssistantsClient,
    audio: AudioClient,
    users: Arc<Users>,
    transactions: Arc<Transactions>,
    categories: Arc<Categories>,
    todos: Arc<Todos>,
    shopping: Arc<Shopping>,
}

impl Brain {
    /// Initialize a new Brain with the given configuration.
    pub async fn new(config: Config) -> Result<Self> {
        let supabase = Arc::new(SupabaseClient::new(
            config.supabase.url.clone(),
            config.supabase.anon_key.clone(),
        ));

        let users = Arc::new(Users::new(Arc::clone(&supabase)));
        let transactions = Arc::new(Transactions::new(Arc::clone(&supabase)));
        let categories = Arc::new(Categories::new(Arc::clone(&supabase)));
        let todos = Arc::new(Todos::new(Arc::clone(&supabase)));
        let reminders = Arc::new(Reminders::new(Arc::clone(&supabase)));
        let shopping = Arc::new(Shopping::new(Arc::clone(&supabase)));
        let savings = Arc::new(Savings::new(Arc::clone(&supabase)));

        let llm = Arc::new(OpenAiChat::new(
            config.llm.api_key.clone(),
            config.llm.model.clone(),
        ));
        let files = FilesClient::new(config.llm.api_key.clone());
        let assistants = AssistantsClient::new(
            config.llm.api_key.clone(),
            config.assistant.model.clone(),
        );
        let audio = AudioClient::new(config.llm.api_key.clone());

        let prefs = Arc::new(PrefsStore::open(&config.brain.database_path).await?);

        let user_id = config.brain.user_id;
        let tz = config.brain.timezone_offset;
        let tools = ToolRegistry::new(vec![
            Box::new(FinanceTool::new(
                Arc::clone(&transactions),
                Arc::clone(&categories),
                user_id,
                tz,
            )),
            Box::new(TaskTool::new(Arc::clone(&todos), user_id)),
            Box::new(ReminderTool::new(
                reminders,
                Arc::clone(&prefs),
                Arc::clone(&llm),
                user_id,
                tz,
            )),
            Box::new(ShoppingTool::new(Arc::clone(&shopping), user_id)),
            Box::new(SavingsTool::new(savings, user_id)),
        ]);

        Ok(Self {
            config,
            llm,
            tools,
            files,
            assistants,
            audio,
            users,
            transactions,
            categories,
            todos,
            shopping,
        })
    }

    /// Handle one user message: run the tool loop, apply the single
    /// corrective turn when the model narrated instead of acting, and
    /// classify transport errors into an in-band reply.
    pub async fn handle_message(&self, text: &str) -> Result<String> {
        let mut messages = vec![
            build_system_prompt(now_unix(), self.config.brain.timezone_offset),
            ChatMessage::text("user", text),
        ];

        let (mut reply, executed) =
            match run_tool_loop(self.llm.as_ref(), &self.tools, &mut messages).await {
                Ok(result) => result,
                Err(e) => {
                    log!(" [chat] llm error: {e}");
                    return Ok(user_facing_message(&e));
                }
            };

        if executed == 0 && claims_unfulfilled_tool_use(&reply) {
            log!(" [chat] narrated intent with no tool call, issuing corrective turn");
            messages.push(ChatMessage::text("assistant", reply.clone()));
            messages.push(ChatMessage::text("user", CORRECTIVE_PROMPT));
            match run_tool_loop(self.llm.as_ref(), &self.tools, &mut messages).await {
                Ok((second, _)) if !second.is_empty() => reply = second,
                Ok(_) => {}
                Err(e) => log!(" [chat] corrective turn failed: {e}"),
            }
        }

        Ok(reply)
    }

    /// Like `handle_message`, but re-emits the final text through the
    /// channel character by character with typing-like pacing.
    pub async fn handle_message_stream(
        &self,
        text: &str,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<String> {
        let reply = self.handle_message(text).await?;
        stream_text(&reply, &tx).await;
        Ok(reply)
    }

    /// Transcribe an audio file (whisper, pt).
    pub async fn transcribe(&self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        self.audio.transcribe(filename, bytes).await
    }

    // ─── Users ───────────────────────────────────────────────────────

    pub async fn register_user(&self, nome: &str, telefone: &str) -> Result<User> {
        self.users.create(nome, None, Some(telefone)).await
    }

    pub async fn login_by_phone(&self, telefone: &str) -> Result<Option<User>> {
        self.users.find_by_phone(telefone).await
    }

    pub async fn rename_user(&self, nome: &str) -> Result<Option<User>> {
        self.users
            .update_profile(
                self.config.brain.user_id,
                serde_json::json!({ "nome": nome }),
            )
            .await
    }

    // ─── Screen-level operations (edit flows the chat tools don't cover) ──

    /// Mark a task as done, stamping `completed_at`.
    pub async fn complete_todo(&self, id: i64) -> Result<Option<Todo>> {
        let now_iso = format_iso_local(now_unix(), self.config.brain.timezone_offset);
        self.todos.set_status(id, "concluido", &now_iso).await
    }

    /// Reopen a completed task, clearing `completed_at`.
    pub async fn reopen_todo(&self, id: i64) -> Result<Option<Todo>> {
        let now_iso = format_iso_local(now_unix(), self.config.brain.timezone_offset);
        self.todos.set_status(id, "pendente", &now_iso).await
    }

    pub async fn delete_todo(&self, id: i64) -> Result<()> {
        self.todos.delete(id).await
    }

    pub async fn delete_transaction(&self, id: i64) -> Result<()> {
        self.transactions.delete(id).await
    }

    /// Toggle a shopping item to "comprado".
    pub async fn mark_item_bought(&self, id: i64) -> Result<Option<ShoppingItem>> {
        self.shopping.set_status(id, "comprado").await
    }

    /// Create an empty named shopping list (writes the placeholder row).
    pub async fn create_shopping_list(&self, name: &str) -> Result<()> {
        self.shopping
            .create_list(self.config.brain.user_id, name)
            .await?;
        Ok(())
    }

    // ─── Maintenance ─────────────────────────────────────────────────

    /// Explicit maintenance pass, run once at startup: purge todos
    /// completed more than 24h ago. Read paths never mutate.
    pub async fn run_maintenance(&self) -> Result<()> {
        let tz = self.config.brain.timezone_offset;
        let cutoff = format_iso_local(now_unix() - 24 * 3600, tz);
        let purged = self
            .todos
            .purge_completed(self.config.brain.user_id, &cutoff)
            .await?;
        if purged > 0 {
            log!(" [maintenance] purged {purged} completed task(s)");
        }
        Ok(())
    }

    // ─── CSV round-trip ──────────────────────────────────────────────

    /// Export all transactions as CSV text.
    pub async fn export_transactions_csv(&self) -> Result<String> {
        let transactions = self
            .transactions
            .list(self.config.brain.user_id)
            .await?;
        let categories = self.categories.list(self.config.brain.user_id).await?;
        let names: HashMap<i64, &str> = categories
            .iter()
            .map(|c| (c.id, c.nome.as_str()))
            .collect();

        let records: Vec<TransactionRecord> = transactions
            .iter()
            .map(|t| TransactionRecord {
                descricao: t.descricao.clone(),
                valor: t.valor,
                tipo: t.tipo.clone(),
                data: t.data.clone(),
                categoria: t
                    .categoria_id
                    .and_then(|id| names.get(&id).copied())
                    .unwrap_or("Outros")
                    .to_string(),
            })
            .collect();

        Ok(csv::export_transactions(&records))
    }

    /// Import transactions from CSV text. Category ids are reassigned via
    /// get-or-create. Returns how many rows were written.
    pub async fn import_transactions_csv(&self, content: &str) -> Result<usize> {
        let records = csv::import_transactions(content).map_err(IonError::Ingest)?;
        let user_id = self.config.brain.user_id;

        let mut imported = 0;
        for record in &records {
            let category = self.categories.get_or_create(user_id, &record.categoria).await?;
            self.transactions
                .create(
                    user_id,
                    &record.descricao,
                    record.valor,
                    &record.tipo,
                    &record.data,
                    Some(category.id),
                )
                .await?;
            imported += 1;
        }

        log!(" [csv] imported {imported} transaction(s)");
        Ok(imported)
    }

    /// Today's date in the configured timezone (used by the REPL banner).
    pub fn today(&self) -> String {
        format_date_local(now_unix(), self.config.brain.timezone_offset)
    }
}
