use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use civicscope_common::{CivicError, Location};

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/lookup", get(api_lookup))
        .route("/api/scrape-agenda", post(api_scrape_agenda))
        .route("/api/search-status", get(api_search_status))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

// --- Lookup ---

#[derive(Deserialize)]
pub struct LookupQuery {
    zip: Option<String>,
    city: Option<String>,
    state: Option<String>,
}

pub async fn api_lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupQuery>,
) -> Response {
    let location = match resolve_location(&state, &params).await {
        Ok(location) => location,
        Err(e) => return error_response(&e),
    };

    info!(%location, "Lookup request");
    let response = state.pipeline.resolve(&location).await;
    Json(response).into_response()
}

/// Derive the request's Location: direct city/state params win, a legacy
/// `zip` param goes through the geocoder. Input problems here are the only
/// hard errors the lookup endpoint produces.
async fn resolve_location(state: &AppState, params: &LookupQuery) -> Result<Location, CivicError> {
    let city = params.city.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let state_name = params
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let (Some(city), Some(state_name)) = (city, state_name) {
        return Ok(Location {
            city: city.to_string(),
            state: state_name.to_string(),
        });
    }

    if let Some(zip) = params.zip.as_deref().map(str::trim).filter(|z| !z.is_empty()) {
        return state.geocoder.lookup(zip).await;
    }

    Err(CivicError::InvalidInput(
        "Provide city and state, or a zip code".to_string(),
    ))
}

fn error_response(err: &CivicError) -> Response {
    let status = match err {
        CivicError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CivicError::ZipNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %err, "Request rejected");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

// --- Scrape agenda ---

#[derive(Deserialize)]
pub struct ScrapeAgendaRequest {
    #[serde(default)]
    url: String,
}

pub async fn api_scrape_agenda(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeAgendaRequest>,
) -> Response {
    let url = body.url.trim().to_string();
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL is required" })),
        )
            .into_response();
    }

    info!(url = url.as_str(), "Scraping agenda");

    match state.fetcher.fetch_page(&url).await {
        Ok(content) => {
            let agenda = state.interpreter.extract_meeting_info(&content, None).await;
            Json(json!({
                "success": true,
                "url": url,
                "agenda": agenda,
                "contentLength": content.len(),
            }))
            .into_response()
        }
        Err(e) => {
            warn!(url = url.as_str(), error = %e, "Agenda scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// --- Search status ---

/// Diagnostic endpoint: reports whether search credentials are configured
/// and, when they are, runs a one-result probe query.
pub async fn api_search_status(State(state): State<Arc<AppState>>) -> Response {
    if !state.search_configured {
        return Json(json!({
            "success": false,
            "configured": false,
            "error": "Missing search credentials",
        }))
        .into_response();
    }

    match state.searcher.search("city council meetings", 1).await {
        Ok(hits) => Json(json!({
            "success": true,
            "configured": true,
            "resultCount": hits.len(),
        }))
        .into_response(),
        Err(e) => Json(json!({
            "success": false,
            "configured": true,
            "error": e.to_string(),
        }))
        .into_response(),
    }
}
