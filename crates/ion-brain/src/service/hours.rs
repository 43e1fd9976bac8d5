//! Suggest a "good" hour for a reminder whose expression carried no
//! explicit time of day.
//!
//! Tiered: the user's remembered hours for the bucket, then an LLM
//! suggestion given the surrounding context, then a clamped arithmetic
//! fallback. The caller re-applies the minimum-lead invariant afterwards.

use ion_core::types::{ChatMessage, ChatRequest};
use ion_llm::provider::LlmProvider;

use super::prefs::{bucket_for, PrefsStore};

/// Earliest and latest hours the arithmetic fallback will pick.
const FALLBACK_EARLIEST: i64 = 8;
const FALLBACK_LATEST: i64 = 18;

/// Parse a single hour (0-23) out of an LLM reply.
pub fn parse_hour_reply(text: &str) -> Option<u8> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let hour: u8 = digits.parse().ok()?;
    (hour <= 23).then_some(hour)
}

/// Current local hour + 1, clamped to working hours.
pub fn fallback_hour(local_hour: i64) -> u8 {
    (local_hour + 1).clamp(FALLBACK_EARLIEST, FALLBACK_LATEST) as u8
}

/// Pick an hour for `title`: remembered preference → LLM → fallback.
pub async fn suggest_hour<P: LlmProvider>(
    prefs: &PrefsStore,
    llm: &P,
    title: &str,
    now: i64,
    tz_offset: i32,
) -> u8 {
    let bucket = bucket_for(title);

    match prefs.remembered_hours(bucket).await {
        Ok(hours) if !hours.is_empty() => {
            log!(" [hours] using remembered hour {} for bucket {bucket}", hours[0]);
            return hours[0];
        }
        Ok(_) => {}
        Err(e) => log!(" [hours] prefs lookup failed: {e}"),
    }

    let local_hour = (now + (tz_offset as i64) * 3600).rem_euclid(86400) / 3600;

    let prompt = format!(
        "Sugira um horário (apenas a hora, 0-23) para um lembrete da categoria \
         \"{bucket}\" com o título \"{title}\". Agora são {local_hour}h. \
         Considere hábitos comuns (por exemplo, consultas médicas raramente \
         depois das 17h). Responda somente com o número da hora."
    );
    let request = ChatRequest {
        messages: vec![ChatMessage::text("user", prompt)],
        max_tokens: Some(8),
        temperature: Some(0.0),
    };

    match llm.chat(request).await {
        Ok(response) => {
            if let Some(hour) = parse_hour_reply(&response.content) {
                log!(" [hours] llm suggested {hour}h for bucket {bucket}");
                return hour;
            }
            log!(" [hours] llm reply not a valid hour: {}", response.content);
        }
        Err(e) => log!(" [hours] llm suggestion failed: {e}"),
    }

    fallback_hour(local_hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ion_core::error::{IonError, Result};
    use ion_core::types::ChatResponse;

    struct CannedLlm {
        reply: Option<String>,
    }

    impl LlmProvider for CannedLlm {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
            match &self.reply {
                Some(text) => Ok(ChatResponse {
                    content: text.clone(),
                    tool_calls: vec![],
                    usage: None,
                }),
                None => Err(IonError::Llm {
                    provider: "fake".to_string(),
                    message: "down".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    async fn temp_store() -> (PrefsStore, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("ion-hours-{}", ion_core::types::new_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = PrefsStore::open(dir.join("prefs.db").to_str().unwrap())
            .await
            .unwrap();
        (store, dir)
    }

    #[test]
    fn test_parse_hour_reply() {
        assert_eq!(parse_hour_reply("15"), Some(15));
        assert_eq!(parse_hour_reply("Sugiro 9h"), Some(9));
        assert_eq!(parse_hour_reply("25"), None);
        assert_eq!(parse_hour_reply("sem ideia"), None);
    }

    #[test]
    fn test_fallback_hour_clamps() {
        assert_eq!(fallback_hour(3), 8);
        assert_eq!(fallback_hour(10), 11);
        assert_eq!(fallback_hour(22), 18);
    }

    #[tokio::test]
    async fn test_remembered_hour_wins() {
        let (store, dir) = temp_store().await;
        store.remember_hour("medico", 10).await.unwrap();
        let llm = CannedLlm { reply: Some("16".to_string()) };
        let hour = suggest_hour(&store, &llm, "consulta com dentista", 0, 0).await;
        assert_eq!(hour, 10);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_llm_tier_when_no_preference() {
        let (store, dir) = temp_store().await;
        let llm = CannedLlm { reply: Some("16".to_string()) };
        let hour = suggest_hour(&store, &llm, "ligar para o banco", 0, 0).await;
        assert_eq!(hour, 16);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_arithmetic_fallback_when_llm_fails() {
        let (store, dir) = temp_store().await;
        let llm = CannedLlm { reply: None };
        // 10:00 UTC, offset 0 → fallback is 11.
        let hour = suggest_hour(&store, &llm, "ligar para o banco", 10 * 3600, 0).await;
        assert_eq!(hour, 11);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
