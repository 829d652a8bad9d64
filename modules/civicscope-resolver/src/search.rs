use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use civicscope_common::{Location, SearchHit};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const RESULTS_PER_QUERY: usize = 3;

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

// --- Google Custom Search ---

pub struct GoogleSearcher {
    api_key: String,
    cx_id: String,
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, serde::Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, serde::Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearcher {
    pub fn new(api_key: &str, cx_id: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            cx_id: cx_id.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint: SEARCH_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl WebSearcher for GoogleSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!(query, max_results, "Google Custom Search");

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx_id.as_str()),
                ("q", query),
                ("num", &max_results.to_string()),
            ])
            .send()
            .await
            .context("Search API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Search API error ({status}): {body}"));
        }

        let data: CseResponse = resp
            .json()
            .await
            .context("Failed to parse search response")?;

        let hits: Vec<SearchHit> = data
            .items
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect();

        info!(query, count = hits.len(), "Search complete");
        Ok(hits)
    }
}

// --- Disabled searcher (no credentials configured) ---

/// Every query fails, which the pipeline treats as "no hits" and degrades to
/// fallback mode, and the process keeps serving.
pub struct DisabledSearcher;

#[async_trait]
impl WebSearcher for DisabledSearcher {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("Search credentials not configured"))
    }
}

// --- Council-meeting query fan-out ---

/// Issue the standard council-meeting query wordings and concatenate the
/// hits in query order, then provider-rank order within each query. Each
/// query's failure is isolated; all of them failing just yields no hits.
pub async fn search_council_meetings(
    searcher: &dyn WebSearcher,
    location: &Location,
) -> Vec<SearchHit> {
    let queries = [
        format!("{} {} city council meetings", location.city, location.state),
        format!(
            "{} {} town hall meetings agenda",
            location.city, location.state
        ),
        format!(
            "{} {} municipal council meetings",
            location.city, location.state
        ),
    ];

    let mut hits = Vec::new();
    for query in &queries {
        match searcher.search(query, RESULTS_PER_QUERY).await {
            Ok(results) => hits.extend(results),
            Err(e) => warn!(query, error = %e, "Search query failed"),
        }
    }

    info!(%location, count = hits.len(), "Candidate discovery complete");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cse_response_parses_ranked_items() {
        let json = r#"{
            "kind": "customsearch#search",
            "items": [
                {"title": "City of Springfield", "link": "https://www.springfield.il.us", "snippet": "Official site"},
                {"title": "Council agendas", "link": "https://www.springfield.il.us/agendas", "snippet": "Meeting agendas"}
            ]
        }"#;
        let parsed: CseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].link, "https://www.springfield.il.us");
    }

    #[test]
    fn cse_response_without_items_is_empty() {
        let parsed: CseResponse = serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(parsed.items.is_empty());
    }
}
