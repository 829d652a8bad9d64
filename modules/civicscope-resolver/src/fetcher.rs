use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use browserless_client::BrowserlessClient;
use civicscope_common::{PageContent, SearchHit};

// --- PageFetcher trait ---

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieve the readable text content of one page.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

// --- SiteFetcher ---

/// Timeout for the lightweight non-rendering path. The rendered path gets
/// its own, longer timeout inside the Browserless client.
const FAST_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Static fetches below this many bytes of extracted text are assumed to be
/// JS shells and retried through the rendering path.
const MIN_STATIC_CONTENT: usize = 200;

/// Max concurrent rendering sessions. Each one ties up a headless browser
/// tab on the Browserless side.
const MAX_RENDER_SESSIONS: usize = 2;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Two-tier page fetcher: plain GET + Readability extraction first, full
/// browser rendering via Browserless as fallback. Held as a long-lived
/// singleton so the HTTP connection pool and rendering permits are shared
/// across requests. Permits are drop-released, so a panicking or failing
/// fetch can never leak a rendering session.
pub struct SiteFetcher {
    http: reqwest::Client,
    browserless: Option<BrowserlessClient>,
    render_permits: Semaphore,
}

impl SiteFetcher {
    pub fn new(browserless_url: Option<&str>, browserless_token: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FAST_FETCH_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        let browserless = browserless_url.map(|base| {
            info!(base_url = base, "Rendered-fetch fallback enabled");
            BrowserlessClient::new(base, browserless_token)
        });

        Self {
            http,
            browserless,
            render_permits: Semaphore::new(MAX_RENDER_SESSIONS),
        }
    }

    async fn fetch_static(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Static fetch failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Static fetch returned status {status}");
        }

        let html = resp.text().await.context("Failed to read response body")?;
        Ok(extract_text(&html, url))
    }

    async fn fetch_rendered(&self, browserless: &BrowserlessClient, url: &str) -> Result<String> {
        let _permit = self
            .render_permits
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("Render permit pool closed"))?;

        info!(url, fetcher = "browserless", "Rendering page");

        let html = browserless
            .content(url)
            .await
            .context("Browserless content request failed")?;

        Ok(extract_text(&html, url))
    }
}

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        let static_text = match self.fetch_static(url).await {
            Ok(text) if text.len() >= MIN_STATIC_CONTENT => {
                info!(url, bytes = text.len(), fetcher = "static", "Fetched page");
                return Ok(text);
            }
            Ok(text) => {
                info!(url, bytes = text.len(), "Thin static content, trying rendered fetch");
                Some(text)
            }
            Err(e) => {
                warn!(url, error = %e, "Static fetch failed, trying rendered fetch");
                None
            }
        };

        if let Some(ref browserless) = self.browserless {
            match self.fetch_rendered(browserless, url).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(url, bytes = text.len(), fetcher = "browserless", "Fetched page");
                    return Ok(text);
                }
                Ok(_) => warn!(url, "Rendered fetch produced no readable content"),
                Err(e) => warn!(url, error = %e, "Rendered fetch failed"),
            }
        }

        // Fall back to whatever the static path produced, thin or not.
        match static_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => anyhow::bail!("No readable content at {url}"),
        }
    }
}

/// Readability extraction: strip navigation, scripts, and boilerplate down
/// to the page's main text.
fn extract_text(html: &str, url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    transform_content_input(input, &config)
}

// --- Batch fetching ---

/// Fetch a set of URLs in bounded windows: `max_concurrent` fetches run at
/// once and the window completes before the next begins. Each fetch's
/// success or failure is isolated from its siblings: a timeout on one URL
/// is just that URL's failure record.
pub async fn fetch_many(
    fetcher: &dyn PageFetcher,
    urls: &[String],
    max_concurrent: usize,
) -> Vec<PageContent> {
    let mut results = Vec::with_capacity(urls.len());

    for window in urls.chunks(max_concurrent.max(1)) {
        let batch = window.iter().map(|url| async move {
            match fetcher.fetch_page(url).await {
                Ok(content) => PageContent::fetched(url.clone(), content),
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "Page fetch failed");
                    PageContent::failed(url.clone(), e.to_string())
                }
            }
        });
        results.extend(futures::future::join_all(batch).await);
    }

    results
}

// --- Agenda URL heuristics ---

const AGENDA_KEYWORDS: &[&str] = &[
    "agenda", "meeting", "council", "minutes", "schedule", "calendar", "session", "hearing",
    "municipal",
];

/// Keyword check for URLs likely to host meeting/agenda content.
pub fn is_likely_agenda_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    AGENDA_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Pick up to `limit` agenda-looking hit URLs to scrape alongside the main
/// target, skipping anything in `exclude` and deduplicating.
pub fn filter_agenda_urls(hits: &[SearchHit], limit: usize, exclude: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for hit in hits {
        if urls.len() >= limit {
            break;
        }
        if exclude.contains(&hit.url) || urls.contains(&hit.url) {
            continue;
        }
        if is_likely_agenda_url(&hit.url) {
            urls.push(hit.url.clone());
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: String::new(),
            url: url.to_string(),
            snippet: String::new(),
        }
    }

    #[test]
    fn agenda_keywords_match_case_insensitively() {
        assert!(is_likely_agenda_url("https://a.gov/City-Council/Agendas"));
        assert!(is_likely_agenda_url("https://a.gov/calendar"));
        assert!(!is_likely_agenda_url("https://a.gov/parks"));
    }

    #[test]
    fn filter_caps_excludes_and_dedups() {
        let hits = vec![
            hit("https://a.gov/meetings"),
            hit("https://a.gov/meetings"),
            hit("https://a.gov/agendas"),
            hit("https://a.gov/council"),
            hit("https://b.com/news"),
        ];
        let exclude = vec!["https://a.gov/meetings".to_string()];
        let urls = filter_agenda_urls(&hits, 2, &exclude);
        assert_eq!(urls, vec!["https://a.gov/agendas", "https://a.gov/council"]);
    }
}
