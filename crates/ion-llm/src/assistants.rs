use std::time::Duration;

use ion_core::error::{IonError, Result};
use reqwest::Client;
use serde_json::json;

use crate::poll::{poll_until, Poll};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// Client for the OpenAI Assistants API (assistants, threads, runs, messages).
///
/// ION creates a transient assistant per document analysis and discards it;
/// nothing here is long-lived except the HTTP client.
pub struct AssistantsClient {
    client: Client,
    api_key: String,
    model: String,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
}

impl AssistantsClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{OPENAI_BASE_URL}{path}");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| IonError::Ingest(format!("assistants request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{OPENAI_BASE_URL}{path}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .send()
            .await
            .map_err(|e| IonError::Ingest(format!("assistants request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IonError::Ingest(format!("failed to read response body: {e}")))?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http { status, body });
        }

        serde_json::from_str(&body)
            .map_err(|e| IonError::Ingest(format!("failed to parse response JSON: {e}")))
    }

    fn extract_id(parsed: &serde_json::Value, what: &str) -> Result<String> {
        parsed["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| IonError::Ingest(format!("missing id in {what} response")))
    }

    /// Create a transient assistant configured with file search.
    pub async fn create_assistant(&self, instructions: &str) -> Result<String> {
        let parsed = self
            .post(
                "/assistants",
                json!({
                    "model": self.model,
                    "name": "ION análise de documentos",
                    "instructions": instructions,
                    "tools": [{ "type": "file_search" }],
                }),
            )
            .await?;
        Self::extract_id(&parsed, "assistant")
    }

    /// Create a thread seeded with the user's message and the file attachment.
    pub async fn create_thread(&self, user_message: &str, file_id: &str) -> Result<String> {
        let parsed = self
            .post(
                "/threads",
                json!({
                    "messages": [{
                        "role": "user",
                        "content": user_message,
                        "attachments": [{
                            "file_id": file_id,
                            "tools": [{ "type": "file_search" }],
                        }],
                    }],
                }),
            )
            .await?;
        Self::extract_id(&parsed, "thread")
    }

    /// Start a run of the assistant over the thread.
    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<String> {
        let parsed = self
            .post(
                &format!("/threads/{thread_id}/runs"),
                json!({ "assistant_id": assistant_id }),
            )
            .await?;
        Self::extract_id(&parsed, "run")
    }

    /// Fetch the current status string of a run.
    pub async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<String> {
        let parsed = self.get(&format!("/threads/{thread_id}/runs/{run_id}")).await?;
        Ok(parsed["status"].as_str().unwrap_or("unknown").to_string())
    }

    /// Poll the run until it completes or fails, bounded by interval × attempts.
    pub async fn wait_run(
        &self,
        thread_id: &str,
        run_id: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<RunOutcome> {
        let outcome = poll_until(interval, max_attempts, || async {
            let status = self.run_status(thread_id, run_id).await?;
            Ok(match status.as_str() {
                "completed" => Some(RunOutcome::Completed),
                "failed" | "cancelled" | "expired" => Some(RunOutcome::Failed(status)),
                _ => None,
            })
        })
        .await;

        match outcome {
            Poll::Ready(result) => Ok(result),
            Poll::TimedOut => Err(IonError::Ingest(format!(
                "run {run_id} did not finish within {max_attempts} attempts"
            ))),
            Poll::Failed(e) => Err(e),
        }
    }

    /// Fetch the newest assistant message text from a thread.
    pub async fn latest_assistant_text(&self, thread_id: &str) -> Result<String> {
        let parsed = self
            .get(&format!("/threads/{thread_id}/messages?order=desc&limit=10"))
            .await?;

        let messages = parsed["data"]
            .as_array()
            .ok_or_else(|| IonError::Ingest("missing data array in messages response".to_string()))?;

        for message in messages {
            if message["role"].as_str() != Some("assistant") {
                continue;
            }
            if let Some(text) = message["content"]
                .as_array()
                .and_then(|blocks| blocks.first())
                .and_then(|block| block["text"]["value"].as_str())
            {
                return Ok(text.to_string());
            }
        }

        Err(IonError::Ingest("no assistant message found in thread".to_string()))
    }
}
