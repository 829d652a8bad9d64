pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use tracing::debug;

/// Default ceiling for one rendered fetch. Rendering waits for network idle,
/// so this is deliberately longer than a plain GET timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    navigation_timeout: Duration,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            navigation_timeout: timeout,
        }
    }

    /// Fetch fully-rendered HTML content for a URL via the Browserless
    /// /content endpoint. Navigation waits for network idle so JS-built
    /// pages (common on municipal agenda portals) render before capture.
    pub async fn content(&self, url: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": self.navigation_timeout.as_millis() as u64,
            },
        });

        debug!(url, "Browserless content request");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
