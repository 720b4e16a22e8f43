use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{Result, ScienceError};

// ─── PoliteClient ─────────────────────────────────────────────────────────────

/// One attempt per request: no retries, no backoff, transport default timeouts.
/// Requests are spaced at least `min_interval` apart.
pub struct PoliteClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl PoliteClient {
    pub fn new(min_interval: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    async fn wait_for_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.wait_for_turn().await;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScienceError::ApiError(
                url.to_string(),
                format!("HTTP {}", status.as_u16()),
            ));
        }
        resp.text().await.map_err(ScienceError::Http)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = PoliteClient::new(Duration::ZERO, "oaenrich-test").unwrap();
        let err = client
            .get(&format!("{}/busy", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScienceError::ApiError(_, ref msg) if msg == "HTTP 503"));
        // A single attempt, never retried.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_configured_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", "Mozilla/5.0 test")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = PoliteClient::new(Duration::ZERO, "Mozilla/5.0 test").unwrap();
        let body = client.get(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = PoliteClient::new(Duration::ZERO, "oaenrich-test").unwrap();
        let err = client
            .get_json::<serde_json::Value>(&format!("{}/json", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScienceError::Parse(_)));
    }
}
