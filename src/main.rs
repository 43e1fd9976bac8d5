use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use ion_brain::brain::Brain;
use ion_core::config::Config;
use ion_core::error::user_facing_message;

#[tokio::main]
async fn main() {
    let config_path = std::env::var("ION_CONFIG").unwrap_or_else(|_| "ion.toml".to_string());

    let config = Config::load(Path::new(&config_path)).unwrap_or_else(|e| {
        eprintln!("fatal: failed to load config: {e}");
        std::process::exit(1);
    });

    if config.llm.api_key.is_empty() {
        eprintln!("fatal: ION_OPENAI_API_KEY is not set");
        std::process::exit(1);
    }
    if config.supabase.url.is_empty() || config.supabase.anon_key.is_empty() {
        eprintln!("fatal: ION_SUPABASE_URL / ION_SUPABASE_ANON_KEY are not set");
        std::process::exit(1);
    }
    if config.brain.user_id == 0 {
        eprintln!("ion: warning: no user configured (set ION_USER_ID or [brain].user_id)");
    }

    eprintln!("ion: starting...");

    let brain = Arc::new(Brain::new(config).await.unwrap_or_else(|e| {
        eprintln!("fatal: failed to initialize brain: {e}");
        std::process::exit(1);
    }));

    if let Err(e) = brain.run_maintenance().await {
        eprintln!("ion: maintenance failed (non-fatal): {e}");
    }

    println!("ION pronto ({}). Digite sua mensagem ou /ajuda.", brain.today());

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("ion: stdin error: {e}");
                break;
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/sair" | "/exit" => break,
            "/ajuda" => {
                print_help();
                continue;
            }
            _ => {}
        }

        if let Some(path) = line.strip_prefix("/exportar ") {
            export_csv(&brain, path.trim()).await;
        } else if let Some(path) = line.strip_prefix("/importar ") {
            import_csv(&brain, path.trim()).await;
        } else if let Some(rest) = line.strip_prefix("/arquivo ") {
            analyze_file(&brain, rest.trim()).await;
        } else if let Some(path) = line.strip_prefix("/audio ") {
            transcribe_and_chat(&brain, path.trim()).await;
        } else if let Some(id) = line.strip_prefix("/concluir ") {
            complete_todo(&brain, id.trim()).await;
        } else if let Some(id) = line.strip_prefix("/reabrir ") {
            reopen_todo(&brain, id.trim()).await;
        } else if let Some(id) = line.strip_prefix("/apagar-tarefa ") {
            delete_by_id(id.trim(), |id| brain.delete_todo(id), "Tarefa").await;
        } else if let Some(id) = line.strip_prefix("/apagar-transacao ") {
            delete_by_id(id.trim(), |id| brain.delete_transaction(id), "Transação").await;
        } else if let Some(id) = line.strip_prefix("/comprado ") {
            mark_bought(&brain, id.trim()).await;
        } else if let Some(nome) = line.strip_prefix("/nova-lista ") {
            create_list(&brain, nome.trim()).await;
        } else if let Some(rest) = line.strip_prefix("/registrar ") {
            register(&brain, rest.trim()).await;
        } else if let Some(telefone) = line.strip_prefix("/login ") {
            login(&brain, telefone.trim()).await;
        } else if let Some(nome) = line.strip_prefix("/nome ") {
            rename(&brain, nome.trim()).await;
        } else if line.starts_with('/') {
            println!("Comando desconhecido. Use /ajuda.");
        } else {
            chat(&brain, line).await;
        }
    }

    eprintln!("ion: até logo");
}

fn print_help() {
    println!(
        "Comandos:\n\
         /arquivo <caminho> [mensagem]  analisa um documento anexado\n\
         /audio <caminho>               transcreve um áudio e responde\n\
         /exportar <caminho>            exporta transações em CSV\n\
         /importar <caminho>            importa transações de um CSV\n\
         /concluir <id>                 marca uma tarefa como concluída\n\
         /reabrir <id>                  reabre uma tarefa concluída\n\
         /apagar-tarefa <id>            apaga uma tarefa\n\
         /apagar-transacao <id>         apaga uma transação\n\
         /comprado <id>                 marca um item de compras como comprado\n\
         /nova-lista <nome>             cria uma lista de compras nomeada\n\
         /registrar <telefone> <nome>   cria um usuário\n\
         /login <telefone>              busca um usuário pelo telefone\n\
         /nome <novo nome>              atualiza o nome do usuário atual\n\
         /sair                          encerra\n\
         Qualquer outro texto é enviado ao assistente."
    );
}

/// Run one chat turn, printing the simulated stream as it arrives.
async fn chat(brain: &Arc<Brain>, text: &str) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let handle = {
        let brain = Arc::clone(brain);
        let text = text.to_string();
        tokio::spawn(async move { brain.handle_message_stream(&text, tx).await })
    };

    while let Some(chunk) = rx.recv().await {
        print!("{chunk}");
        let _ = std::io::stdout().flush();
    }
    println!();

    match handle.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => println!("{}", user_facing_message(&e)),
        Err(e) => eprintln!("ion: chat task panicked: {e}"),
    }
}

async fn analyze_file(brain: &Arc<Brain>, rest: &str) {
    let (path, message) = match rest.split_once(' ') {
        Some((p, m)) => (p, m.trim()),
        None => (rest, ""),
    };
    let message = if message.is_empty() {
        "Analise este documento e resuma os pontos principais."
    } else {
        message
    };

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            println!("Não consegui ler {path}: {e}");
            return;
        }
    };
    let filename = path.rsplit('/').next().unwrap_or(path);

    match brain.analyze_document(filename, bytes, message).await {
        Ok(analysis) => println!("{}", analysis.answer),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn transcribe_and_chat(brain: &Arc<Brain>, path: &str) {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            println!("Não consegui ler {path}: {e}");
            return;
        }
    };
    let filename = path.rsplit('/').next().unwrap_or(path);

    match brain.transcribe(filename, bytes).await {
        Ok(transcript) => {
            println!("Transcrição: {transcript}");
            chat(brain, &transcript).await;
        }
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn export_csv(brain: &Arc<Brain>, path: &str) {
    match brain.export_transactions_csv().await {
        Ok(content) => match std::fs::write(path, &content) {
            Ok(()) => {
                let rows = content.lines().count().saturating_sub(1);
                println!("Exportadas {rows} transações para {path}.");
            }
            Err(e) => println!("Não consegui escrever {path}: {e}"),
        },
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn import_csv(brain: &Arc<Brain>, path: &str) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            println!("Não consegui ler {path}: {e}");
            return;
        }
    };
    match brain.import_transactions_csv(&content).await {
        Ok(count) => println!("Importadas {count} transações de {path}."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            println!("Informe um id numérico.");
            None
        }
    }
}

async fn complete_todo(brain: &Arc<Brain>, raw: &str) {
    let Some(id) = parse_id(raw) else { return };
    match brain.complete_todo(id).await {
        Ok(Some(todo)) => println!("Tarefa concluída: {}", todo.titulo),
        Ok(None) => println!("Tarefa {id} não encontrada."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn reopen_todo(brain: &Arc<Brain>, raw: &str) {
    let Some(id) = parse_id(raw) else { return };
    match brain.reopen_todo(id).await {
        Ok(Some(todo)) => println!("Tarefa reaberta: {}", todo.titulo),
        Ok(None) => println!("Tarefa {id} não encontrada."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn delete_by_id<F, Fut>(raw: &str, delete: F, what: &str)
where
    F: FnOnce(i64) -> Fut,
    Fut: std::future::Future<Output = ion_core::error::Result<()>>,
{
    let Some(id) = parse_id(raw) else { return };
    match delete(id).await {
        Ok(()) => println!("{what} {id} apagada."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn mark_bought(brain: &Arc<Brain>, raw: &str) {
    let Some(id) = parse_id(raw) else { return };
    match brain.mark_item_bought(id).await {
        Ok(Some(item)) => println!("Item comprado: {}", item.nome),
        Ok(None) => println!("Item {id} não encontrado."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn create_list(brain: &Arc<Brain>, nome: &str) {
    if nome.is_empty() {
        println!("Uso: /nova-lista <nome>");
        return;
    }
    match brain.create_shopping_list(nome).await {
        Ok(()) => println!("Lista \"{nome}\" criada."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn register(brain: &Arc<Brain>, rest: &str) {
    let Some((telefone, nome)) = rest.split_once(' ') else {
        println!("Uso: /registrar <telefone> <nome>");
        return;
    };
    match brain.register_user(nome.trim(), telefone.trim()).await {
        Ok(user) => println!(
            "Usuário {} criado com id {}. Configure ION_USER_ID={} para usá-lo.",
            user.nome, user.id, user.id
        ),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn login(brain: &Arc<Brain>, telefone: &str) {
    match brain.login_by_phone(telefone).await {
        Ok(Some(user)) => println!(
            "Encontrado: {} (id {}). Configure ION_USER_ID={} para usá-lo.",
            user.nome, user.id, user.id
        ),
        Ok(None) => println!("Nenhum usuário com o telefone {telefone}."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}

async fn rename(brain: &Arc<Brain>, nome: &str) {
    match brain.rename_user(nome).await {
        Ok(Some(user)) => println!("Nome atualizado para {}.", user.nome),
        Ok(None) => println!("Usuário atual não encontrado."),
        Err(e) => println!("{}", user_facing_message(&e)),
    }
}
