use ion_core::error::{IonError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

const OPENAI_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Client for the OpenAI audio transcription endpoint (whisper-1).
pub struct AudioClient {
    client: Client,
    api_key: String,
}

impl AudioClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Transcribe an audio file. Portuguese is hinted to the model.
    pub async fn transcribe(&self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("audio/mpeg")
            .map_err(|e| IonError::Audio(format!("invalid mime type: {e}")))?;

        let form = Form::new()
            .text("model", "whisper-1")
            .text("language", "pt")
            .part("file", part);

        let response = self
            .client
            .post(OPENAI_TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IonError::Audio(format!("transcription request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IonError::Audio(format!("failed to read transcription response: {e}")))?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http { status, body });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| IonError::Audio(format!("failed to parse transcription response: {e}")))?;

        parsed["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| IonError::Audio("missing text in transcription response".to_string()))
    }
}
