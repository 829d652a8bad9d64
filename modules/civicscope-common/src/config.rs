use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// API keys are optional on purpose: a missing key degrades the stage it
/// feeds (search falls through to fallback mode, inference calls take their
/// degrade branches) rather than refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    // Web search (Google Custom Search)
    pub google_search_api_key: Option<String>,
    pub google_cx_id: Option<String>,

    // Inference
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,

    // Rendered-fetch fallback
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Geocoding
    pub geocoder_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_GEOCODER_URL: &str = "https://api.zippopotam.us";

impl Config {
    pub fn from_env() -> Self {
        Self {
            google_search_api_key: optional_env("GOOGLE_SEARCH_API_KEY"),
            google_cx_id: optional_env("GOOGLE_CX_ID"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    /// Both search credentials present.
    pub fn search_configured(&self) -> bool {
        self.google_search_api_key.is_some() && self.google_cx_id.is_some()
    }

    /// Log which collaborators are configured, without leaking key material.
    pub fn log_redacted(&self) {
        info!(
            search = self.search_configured(),
            inference = self.anthropic_api_key.is_some(),
            model = %self.anthropic_model,
            browserless = self.browserless_url.is_some(),
            geocoder = %self.geocoder_url,
            "Configuration loaded"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
