//! Document ingestion: classify an attachment, push PDFs through the
//! Files + Assistants pipeline, and degrade to a plain completion when any
//! stage fails.

use std::time::Duration;

use ion_core::error::Result;
use ion_core::types::{ChatMessage, ChatRequest};
use ion_llm::provider::LlmProvider;

use super::Brain;

/// How an attachment is handled, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Read directly and inlined into the prompt (truncated).
    Text,
    /// Uploaded and analyzed through the Assistants API.
    Pdf,
    /// Only name/type are mentioned; content is never read.
    Opaque,
}

pub fn classify(filename: &str) -> AttachmentKind {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match extension.as_str() {
        "txt" | "md" | "csv" | "json" | "log" => AttachmentKind::Text,
        "pdf" => AttachmentKind::Pdf,
        _ => AttachmentKind::Opaque,
    }
}

/// Truncate at a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Phrases that signal the model narrated an action instead of taking it.
const NARRATED_INTENT: [&str; 8] = [
    "vou usar",
    "vou utilizar",
    "vou consultar",
    "vou verificar o arquivo",
    "vou buscar no arquivo",
    "file_search",
    "i will use",
    "let me use",
];

/// True when a reply claims it "will use" a tool or file search — paired
/// with a zero tool-call count, this triggers one corrective turn.
pub fn claims_unfulfilled_tool_use(text: &str) -> bool {
    let lower = text.to_lowercase();
    NARRATED_INTENT.iter().any(|phrase| lower.contains(phrase))
}

/// Result of analyzing one attachment.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub answer: String,
    /// True when the full pipeline failed and the answer came from the
    /// no-file-access fallback.
    pub degraded: bool,
}

const ANALYSIS_INSTRUCTIONS: &str =
    "Você analisa documentos anexados pelo usuário. Use a busca no arquivo \
     para responder com base no conteúdo real. Responda em português do Brasil.";

impl Brain {
    /// Analyze one attachment together with the user's message.
    ///
    /// State machine: classify → (upload → poll → assistant/thread/run →
    /// fetch answer) → degrade to a plain completion on any failure.
    pub async fn analyze_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        user_message: &str,
    ) -> Result<DocumentAnalysis> {
        match classify(filename) {
            AttachmentKind::Text => self.analyze_text(filename, &bytes, user_message).await,
            AttachmentKind::Pdf => self.analyze_pdf(filename, bytes, user_message).await,
            AttachmentKind::Opaque => self.analyze_opaque(filename, user_message).await,
        }
    }

    async fn analyze_text(
        &self,
        filename: &str,
        bytes: &[u8],
        user_message: &str,
    ) -> Result<DocumentAnalysis> {
        let content = String::from_utf8_lossy(bytes);
        let content = truncate_chars(&content, self.config.brain.max_attachment_chars);
        log!(" [ingest] {filename}: inlining {} chars", content.len());

        let request = ChatRequest {
            messages: vec![
                ChatMessage::text("system", ANALYSIS_INSTRUCTIONS),
                ChatMessage::text(
                    "user",
                    format!(
                        "{user_message}\n\nConteúdo do arquivo {filename}:\n\n{content}"
                    ),
                ),
            ],
            max_tokens: Some(1024),
            temperature: Some(0.3),
        };

        let response = self.llm.chat(request).await?;
        Ok(DocumentAnalysis {
            answer: response.content,
            degraded: false,
        })
    }

    async fn analyze_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        user_message: &str,
    ) -> Result<DocumentAnalysis> {
        let file_id = match self.files.upload(filename, bytes).await {
            Ok(uploaded) => {
                log!(" [ingest] uploaded {filename} as {}", uploaded.id);
                Some(uploaded.id)
            }
            Err(e) => {
                log!(" [ingest] upload failed for {filename}: {e}");
                None
            }
        };

        if let Some(id) = &file_id {
            let assistant_cfg = &self.config.assistant;
            let processed = self
                .files
                .wait_processed(
                    id,
                    Duration::from_secs(assistant_cfg.file_poll_interval_secs),
                    assistant_cfg.file_poll_attempts,
                )
                .await;
            if !processed {
                log!(" [ingest] file {id} not processed in time, proceeding anyway");
            }

            match self.run_assistant_analysis(id, user_message).await {
                Ok(answer) => {
                    return Ok(DocumentAnalysis {
                        answer,
                        degraded: false,
                    })
                }
                Err(e) => log!(" [ingest] assistant analysis failed: {e}"),
            }
        }

        self.fallback_completion(file_id.as_deref(), filename, user_message)
            .await
    }

    async fn run_assistant_analysis(&self, file_id: &str, user_message: &str) -> Result<String> {
        let assistant_cfg = &self.config.assistant;

        let assistant_id = self.assistants.create_assistant(ANALYSIS_INSTRUCTIONS).await?;
        let thread_id = self.assistants.create_thread(user_message, file_id).await?;
        let run_id = self.assistants.create_run(&thread_id, &assistant_id).await?;
        log!(" [ingest] run {run_id} started on thread {thread_id}");

        match self
            .assistants
            .wait_run(
                &thread_id,
                &run_id,
                Duration::from_secs(assistant_cfg.run_poll_interval_secs),
                assistant_cfg.run_poll_attempts,
            )
            .await?
        {
            ion_llm::assistants::RunOutcome::Completed => {
                self.assistants.latest_assistant_text(&thread_id).await
            }
            ion_llm::assistants::RunOutcome::Failed(status) => {
                Err(ion_core::error::IonError::Ingest(format!(
                    "run {run_id} ended as {status}"
                )))
            }
        }
    }

    /// Last resort: a plain completion that mentions the file inline and
    /// discloses that real file access may be unavailable.
    async fn fallback_completion(
        &self,
        file_id: Option<&str>,
        filename: &str,
        user_message: &str,
    ) -> Result<DocumentAnalysis> {
        let file_note = match file_id {
            Some(id) => format!("O arquivo {filename} foi enviado com o id {id}."),
            None => format!("O arquivo {filename} foi anexado, mas o envio falhou."),
        };

        let request = ChatRequest {
            messages: vec![
                ChatMessage::text("system", ANALYSIS_INSTRUCTIONS),
                ChatMessage::text(
                    "user",
                    format!(
                        "{user_message}\n\n{file_note} Você talvez não tenha acesso \
                         real ao conteúdo do arquivo; responda da melhor forma \
                         possível e deixe essa limitação clara."
                    ),
                ),
            ],
            max_tokens: Some(1024),
            temperature: Some(0.3),
        };

        let response = self.llm.chat(request).await?;
        log!(" [ingest] degraded answer for {filename} ({} chars)", response.content.len());
        Ok(DocumentAnalysis {
            answer: response.content,
            degraded: true,
        })
    }

    async fn analyze_opaque(&self, filename: &str, user_message: &str) -> Result<DocumentAnalysis> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::text("system", ANALYSIS_INSTRUCTIONS),
                ChatMessage::text(
                    "user",
                    format!(
                        "{user_message}\n\nO usuário anexou o arquivo {filename}, \
                         de um tipo cujo conteúdo não pode ser lido. Responda com \
                         base apenas no nome e tipo do arquivo."
                    ),
                ),
            ],
            max_tokens: Some(1024),
            temperature: Some(0.3),
        };

        let response = self.llm.chat(request).await?;
        Ok(DocumentAnalysis {
            answer: response.content,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("notas.txt"), AttachmentKind::Text);
        assert_eq!(classify("README.MD"), AttachmentKind::Text);
        assert_eq!(classify("extrato.csv"), AttachmentKind::Text);
        assert_eq!(classify("contrato.pdf"), AttachmentKind::Pdf);
        assert_eq!(classify("Contrato.PDF"), AttachmentKind::Pdf);
        assert_eq!(classify("foto.jpg"), AttachmentKind::Opaque);
        assert_eq!(classify("sem_extensao"), AttachmentKind::Opaque);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        // Multi-byte chars are cut on a boundary, not mid-codepoint.
        assert_eq!(truncate_chars("ação", 3), "açã");
    }

    #[test]
    fn test_claims_unfulfilled_tool_use() {
        assert!(claims_unfulfilled_tool_use(
            "Vou usar a busca no arquivo para verificar."
        ));
        assert!(claims_unfulfilled_tool_use("Deixe-me acionar o file_search."));
        assert!(!claims_unfulfilled_tool_use(
            "O documento fala sobre o contrato de aluguel."
        ));
    }
}
