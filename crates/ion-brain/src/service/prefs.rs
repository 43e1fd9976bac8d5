use libsql::{Builder, Connection, Database};

use ion_core::error::{IonError, Result};

/// At most this many confirmed hours are remembered per bucket.
pub const MAX_REMEMBERED_HOURS: usize = 5;

fn db_err(e: libsql::Error) -> IonError {
    IonError::Database(e.to_string())
}

/// Coarse keyword-derived category for preferred reminder hours.
pub fn bucket_for(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    const EXERCISE: [&str; 7] = [
        "treino", "academia", "correr", "caminhada", "exercício", "exercicio", "pedal",
    ];
    const SHOPPING: [&str; 5] = ["comprar", "compras", "mercado", "feira", "shopping"];
    const MEDICAL: [&str; 8] = [
        "médico", "medico", "consulta", "remédio", "remedio", "dentista", "exame", "farmácia",
    ];

    if EXERCISE.iter().any(|k| lower.contains(k)) {
        "exercicio"
    } else if SHOPPING.iter().any(|k| lower.contains(k)) {
        "compras"
    } else if MEDICAL.iter().any(|k| lower.contains(k)) {
        "medico"
    } else {
        "geral"
    }
}

/// Most-recent-first merge of a confirmed hour into the remembered set,
/// deduplicated and capped.
pub fn merge_hours(existing: &[u8], hour: u8) -> Vec<u8> {
    let mut merged = vec![hour];
    for &h in existing {
        if h != hour && merged.len() < MAX_REMEMBERED_HOURS {
            merged.push(h);
        }
    }
    merged
}

/// Local store of the user's preferred reminder hours, keyed by bucket.
///
/// The only durable local state in ION; everything else lives in the BaaS.
pub struct PrefsStore {
    db: Database,
}

impl PrefsStore {
    /// Open (and initialize) the local database at the given path.
    pub async fn open(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await.map_err(db_err)?;
        let store = Self { db };
        store.init().await?;
        Ok(store)
    }

    fn conn(&self) -> Result<Connection> {
        self.db.connect().map_err(db_err)
    }

    async fn init(&self) -> Result<()> {
        self.conn()?
            .execute(
                "CREATE TABLE IF NOT EXISTS preferred_hours (
                    bucket TEXT PRIMARY KEY,
                    hours TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Remembered hours for a bucket, most recent first.
    pub async fn remembered_hours(&self, bucket: &str) -> Result<Vec<u8>> {
        let mut rows = self
            .conn()?
            .query(
                "SELECT hours FROM preferred_hours WHERE bucket = ?",
                libsql::params![bucket.to_string()],
            )
            .await
            .map_err(db_err)?;

        let Some(row) = rows.next().await.map_err(db_err)? else {
            return Ok(Vec::new());
        };
        let raw = row.get::<String>(0).map_err(db_err)?;
        let hours: Vec<u8> = serde_json::from_str(&raw)
            .map_err(|e| IonError::Database(format!("corrupt hours for {bucket}: {e}")))?;
        Ok(hours)
    }

    /// Record a confirmed hour for a bucket.
    pub async fn remember_hour(&self, bucket: &str, hour: u8) -> Result<()> {
        let existing = self.remembered_hours(bucket).await.unwrap_or_default();
        let merged = merge_hours(&existing, hour);
        let encoded = serde_json::to_string(&merged)
            .map_err(|e| IonError::Database(format!("failed to encode hours: {e}")))?;

        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO preferred_hours (bucket, hours) VALUES (?, ?)",
                libsql::params![bucket.to_string(), encoded],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_for_keywords() {
        assert_eq!(bucket_for("Treino de pernas"), "exercicio");
        assert_eq!(bucket_for("comprar pão na feira"), "compras");
        assert_eq!(bucket_for("Consulta com o dentista"), "medico");
        assert_eq!(bucket_for("ligar para o banco"), "geral");
    }

    #[test]
    fn test_merge_hours_most_recent_first() {
        assert_eq!(merge_hours(&[9, 10], 15), vec![15, 9, 10]);
    }

    #[test]
    fn test_merge_hours_dedupes() {
        assert_eq!(merge_hours(&[15, 9], 9), vec![9, 15]);
    }

    #[test]
    fn test_merge_hours_caps_at_five() {
        let merged = merge_hours(&[1, 2, 3, 4, 5], 6);
        assert_eq!(merged.len(), MAX_REMEMBERED_HOURS);
        assert_eq!(merged, vec![6, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("ion-prefs-{}", ion_core::types::new_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prefs.db");
        let store = PrefsStore::open(path.to_str().unwrap()).await.unwrap();

        assert!(store.remembered_hours("geral").await.unwrap().is_empty());

        store.remember_hour("geral", 9).await.unwrap();
        store.remember_hour("geral", 14).await.unwrap();
        assert_eq!(store.remembered_hours("geral").await.unwrap(), vec![14, 9]);

        for hour in [1, 2, 3, 4, 5, 6] {
            store.remember_hour("medico", hour).await.unwrap();
        }
        let hours = store.remembered_hours("medico").await.unwrap();
        assert_eq!(hours.len(), MAX_REMEMBERED_HOURS);
        assert_eq!(hours[0], 6);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
