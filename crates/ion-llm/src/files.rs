use std::time::Duration;

use ion_core::error::{IonError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::poll::poll_until;

const OPENAI_FILES_URL: &str = "https://api.openai.com/v1/files";

/// Client for the OpenAI Files API (uploads destined for the Assistants API).
pub struct FilesClient {
    client: Client,
    api_key: String,
}

/// An uploaded file handle.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: String,
    pub status: String,
}

impl FilesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Upload raw bytes with `purpose=assistants`.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| IonError::Ingest(format!("invalid mime type: {e}")))?;

        let form = Form::new().text("purpose", "assistants").part("file", part);

        let response = self
            .client
            .post(OPENAI_FILES_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IonError::Ingest(format!("file upload failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IonError::Ingest(format!("failed to read upload response: {e}")))?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http { status, body });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| IonError::Ingest(format!("failed to parse upload response: {e}")))?;

        let id = parsed["id"]
            .as_str()
            .ok_or_else(|| IonError::Ingest("missing id in upload response".to_string()))?
            .to_string();
        let status = parsed["status"].as_str().unwrap_or("uploaded").to_string();

        Ok(UploadedFile { id, status })
    }

    /// Fetch the current processing status of an uploaded file.
    pub async fn status(&self, file_id: &str) -> Result<String> {
        let url = format!("{OPENAI_FILES_URL}/{file_id}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| IonError::Ingest(format!("file status request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IonError::Ingest(format!("failed to read status response: {e}")))?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http { status, body });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| IonError::Ingest(format!("failed to parse status response: {e}")))?;

        Ok(parsed["status"].as_str().unwrap_or("unknown").to_string())
    }

    /// Wait until the file reaches `processed`, bounded by interval × attempts.
    ///
    /// Returns `true` when processed, `false` on timeout or probe failure —
    /// the caller proceeds with the file id either way (best effort).
    pub async fn wait_processed(
        &self,
        file_id: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> bool {
        let outcome = poll_until(interval, max_attempts, || async {
            let status = self.status(file_id).await?;
            Ok((status == "processed").then_some(()))
        })
        .await;
        outcome.is_ready()
    }
}
