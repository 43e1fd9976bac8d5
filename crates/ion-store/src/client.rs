use ion_core::error::{IonError, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// Thin PostgREST client over the BaaS REST interface.
///
/// One long-lived handle is shared by every adapter; each call is an
/// independent round trip with no cross-call atomicity.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    /// # Arguments
    /// * `url` - Project URL (e.g. "https://xyz.supabase.co")
    /// * `anon_key` - Anonymous API key
    pub fn new(url: String, anon_key: String) -> Self {
        let base_url = format!("{}/rest/v1", url.trim_end_matches('/'));
        Self {
            client: Client::new(),
            base_url,
            anon_key,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{table}", self.base_url);
        self.client
            .request(method, &url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn read_rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IonError::Store(format!("failed to read response body: {e}")))?;

        if status < 200 || status >= 300 {
            return Err(IonError::Http { status, body });
        }

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&body)
            .map_err(|e| IonError::Store(format!("failed to parse rows: {e}")))
    }

    /// SELECT rows matching PostgREST-style filters (e.g. `("user_id", "eq.3")`).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().map(|(k, v)| (*k, v.clone())));

        let response = self
            .request(Method::GET, table)
            .query(&query)
            .send()
            .await
            .map_err(|e| IonError::Store(format!("select on {table} failed: {e}")))?;

        Self::read_rows(response).await
    }

    /// INSERT a row, returning the stored representation.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| IonError::Store(format!("insert on {table} failed: {e}")))?;

        let mut rows: Vec<T> = Self::read_rows(response).await?;
        rows.pop()
            .ok_or_else(|| IonError::Store(format!("insert on {table} returned no rows")))
    }

    /// UPDATE rows matching the filters, returning the stored representations.
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<Vec<T>> {
        let query: Vec<(&str, String)> = filters.iter().map(|(k, v)| (*k, v.clone())).collect();

        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&query)
            .json(body)
            .send()
            .await
            .map_err(|e| IonError::Store(format!("update on {table} failed: {e}")))?;

        Self::read_rows(response).await
    }

    /// DELETE rows matching the filters, returning the deleted representations.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let query: Vec<(&str, String)> = filters.iter().map(|(k, v)| (*k, v.clone())).collect();

        let response = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&query)
            .send()
            .await
            .map_err(|e| IonError::Store(format!("delete on {table} failed: {e}")))?;

        Self::read_rows(response).await
    }
}
