//! Shared HTTP client for all adapters.

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::SourceError;

/// Thin wrapper over [`reqwest::Client`] that sends the configured
/// User-Agent and turns non-success statuses into [`SourceError::Server`].
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// GET `url` with `query` appended and return the body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        self.get(url, query, None).await
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let body = self.get(url, query, Some("application/json")).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        accept: Option<&str>,
    ) -> Result<String, SourceError> {
        debug!(url = %url, params = query.len(), "GET");
        let mut request = self.client.get(url).query(query);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text().await?)
    }
}
