use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::{ChatModel, Claude, UnconfiguredModel};
use civicscope_common::Config;
use civicscope_resolver::fetcher::{PageFetcher, SiteFetcher};
use civicscope_resolver::pipeline::ResolutionPipeline;
use civicscope_resolver::search::{DisabledSearcher, GoogleSearcher, WebSearcher};
use civicscope_resolver::ResultInterpreter;

mod geocode;
mod rest;

use geocode::ZipGeocoder;

pub struct AppState {
    pub pipeline: ResolutionPipeline,
    pub interpreter: ResultInterpreter,
    pub fetcher: Arc<dyn PageFetcher>,
    pub searcher: Arc<dyn WebSearcher>,
    pub geocoder: ZipGeocoder,
    pub search_configured: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("civicscope=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let model: Arc<dyn ChatModel> = match config.anthropic_api_key {
        Some(ref key) => Arc::new(Claude::new(key, &config.anthropic_model)),
        None => Arc::new(UnconfiguredModel),
    };

    let searcher: Arc<dyn WebSearcher> =
        match (&config.google_search_api_key, &config.google_cx_id) {
            (Some(key), Some(cx)) => Arc::new(GoogleSearcher::new(key, cx)),
            _ => Arc::new(DisabledSearcher),
        };

    // One fetcher for the life of the process: it owns the HTTP connection
    // pool and the bounded rendering permits shared across requests.
    let fetcher: Arc<dyn PageFetcher> = Arc::new(SiteFetcher::new(
        config.browserless_url.as_deref(),
        config.browserless_token.as_deref(),
    ));

    let state = Arc::new(AppState {
        pipeline: ResolutionPipeline::new(searcher.clone(), fetcher.clone(), model.clone()),
        interpreter: ResultInterpreter::new(model),
        fetcher,
        searcher,
        geocoder: ZipGeocoder::new(&config.geocoder_url),
        search_configured: config.search_configured(),
    });

    let app = rest::router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(addr = addr.as_str(), "CivicScope API listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
