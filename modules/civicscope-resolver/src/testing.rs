//! Scripted test doubles for the pipeline's collaborator seams.
//!
//! Compiled for tests (and the `test-support` feature) only. Each double is
//! deterministic: searches pop pre-loaded batches, models answer by matching
//! a marker substring against the system prompt, fetchers serve a fixed
//! url-to-text map and count their calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use ai_client::ChatModel;
use civicscope_common::SearchHit;

use crate::fetcher::PageFetcher;
use crate::search::WebSearcher;

// --- ChatModel doubles ---

/// Answers each call with the reply whose marker appears in the system
/// prompt; unmatched prompts error, which exercises the degrade branches.
#[derive(Default)]
pub struct ScriptedModel {
    rules: Vec<(String, String)>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_when(mut self, marker: &str, reply: &str) -> Self {
        self.rules.push((marker.to_string(), reply.to_string()));
        self
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, system: &str, _user: &str) -> Result<String> {
        self.rules
            .iter()
            .find(|(marker, _)| system.contains(marker))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| anyhow!("No scripted reply for this prompt"))
    }
}

/// Every call fails, as when no inference key is configured.
pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(anyhow!("Inference unavailable"))
    }
}

// --- WebSearcher doubles ---

/// Serves pre-loaded hit batches, one per query, then empty results.
pub struct StaticSearcher {
    batches: Mutex<Vec<Vec<SearchHit>>>,
}

impl StaticSearcher {
    pub fn new(mut batches: Vec<Vec<SearchHit>>) -> Self {
        batches.reverse();
        Self {
            batches: Mutex::new(batches),
        }
    }

    /// One batch for the first query, nothing for the rest.
    pub fn once(hits: Vec<SearchHit>) -> Self {
        Self::new(vec![hits])
    }

    /// Zero hits for every query.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl WebSearcher for StaticSearcher {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        let mut batches = self.batches.lock().expect("batches lock");
        Ok(batches.pop().unwrap_or_default())
    }
}

/// Every query errors, as when the search API is down or unconfigured.
pub struct FailingSearcher;

#[async_trait]
impl WebSearcher for FailingSearcher {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("Search API unavailable"))
    }
}

// --- PageFetcher double ---

/// Serves canned text for known URLs and fails (as a timeout would) for
/// anything else, counting every call either way.
#[derive(Default)]
pub struct RecordingFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, content: &str) -> Self {
        self.pages.insert(url.to_string(), content.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("Fetch timed out for {url}"))
    }
}

/// Convenience constructor for hits in tests.
pub fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}
