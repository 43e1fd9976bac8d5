use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IonError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub brain: BrainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key: String::new(),
        }
    }
}

/// Settings for the document-analysis path (Files + Assistants APIs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_model")]
    pub model: String,
    #[serde(default = "default_file_poll_interval")]
    pub file_poll_interval_secs: u64,
    #[serde(default = "default_file_poll_attempts")]
    pub file_poll_attempts: u32,
    #[serde(default = "default_run_poll_interval")]
    pub run_poll_interval_secs: u64,
    #[serde(default = "default_run_poll_attempts")]
    pub run_poll_attempts: u32,
}

fn default_assistant_model() -> String {
    "gpt-4o".to_string()
}

fn default_file_poll_interval() -> u64 {
    2
}

fn default_file_poll_attempts() -> u32 {
    20
}

fn default_run_poll_interval() -> u64 {
    1
}

fn default_run_poll_attempts() -> u32 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_assistant_model(),
            file_poll_interval_secs: default_file_poll_interval(),
            file_poll_attempts: default_file_poll_attempts(),
            run_poll_interval_secs: default_run_poll_interval(),
            run_poll_attempts: default_run_poll_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    /// UTC offset in hours (e.g., -3 for BRT/UTC-3).
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32,
    /// The user all adapters act on behalf of.
    #[serde(default)]
    pub user_id: i64,
    /// Local database path (preferred reminder hours).
    #[serde(default = "default_db_path")]
    pub database_path: String,
    /// Plain-text attachments are truncated at this many characters.
    #[serde(default = "default_max_attachment_chars")]
    pub max_attachment_chars: usize,
}

fn default_timezone_offset() -> i32 {
    -3 // BRT (UTC-3)
}

fn default_db_path() -> String {
    "ion.db".to_string()
}

fn default_max_attachment_chars() -> usize {
    100_000
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            timezone_offset: default_timezone_offset(),
            user_id: 0,
            database_path: default_db_path(),
            max_attachment_chars: default_max_attachment_chars(),
        }
    }
}

impl Config {
    /// Load config: defaults → ion.toml → env vars (env wins).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| IonError::Config(format!("failed to read config: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| IonError::Config(format!("failed to parse config: {e}")))?
        } else {
            Self::default()
        };

        if let Ok(v) = std::env::var("ION_OPENAI_API_KEY") {
            config.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("ION_SUPABASE_URL") {
            config.supabase.url = v;
        }
        if let Ok(v) = std::env::var("ION_SUPABASE_ANON_KEY") {
            config.supabase.anon_key = v;
        }
        if let Ok(v) = std::env::var("ION_USER_ID") {
            config.brain.user_id = v
                .parse()
                .map_err(|_| IonError::Config(format!("ION_USER_ID is not a number: {v}")))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.brain.timezone_offset, -3);
        assert_eq!(config.assistant.file_poll_attempts, 20);
        assert_eq!(config.assistant.run_poll_attempts, 30);
        assert_eq!(config.brain.max_attachment_chars, 100_000);
    }

    #[test]
    fn test_parse_partial_toml() {
        let parsed: Config = toml::from_str(
            r#"
            [supabase]
            url = "https://example.supabase.co"

            [brain]
            timezone_offset = 0
            user_id = 7
            "#,
        )
        .unwrap();
        assert_eq!(parsed.supabase.url, "https://example.supabase.co");
        assert_eq!(parsed.brain.timezone_offset, 0);
        assert_eq!(parsed.brain.user_id, 7);
        // Untouched sections keep their defaults
        assert_eq!(parsed.llm.model, "gpt-4o-mini");
        assert_eq!(parsed.assistant.run_poll_interval_secs, 1);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/ion.toml")).unwrap();
        assert_eq!(config.brain.database_path, "ion.db");
    }
}
