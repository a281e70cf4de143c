//! HTTP request handlers.
//!
//! Validation failures surface as 400s; everything else is fire-and-forget
//! with errors observable through logs and stats, so handlers stay thin.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use url::Url;

use super::types::{CrawlParams, HealthResponse, SearchParams, StatsResponse, StatusMessage};
use super::AppState;

/// Result count used when `k` is absent or not a non-negative integer.
const DEFAULT_TOP_K: usize = 10;

/// `GET /search` — ranked full-text query.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let Some(query) = params.query.filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "invalid query: missing 'search-query' parameter",
        )
            .into_response();
    };

    let top_k = params
        .k
        .as_deref()
        .and_then(|k| k.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP_K);

    let results = state.index.search(&query, top_k);
    Json(results).into_response()
}

/// `POST /crawl` — validate the URL and start an asynchronous crawl.
pub async fn crawl(
    State(state): State<AppState>,
    Query(params): Query<CrawlParams>,
) -> impl IntoResponse {
    let Some(raw) = params.url.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "invalid query: missing 'url' parameter",
        )
            .into_response();
    };

    let valid = Url::parse(&raw)
        .map(|u| u.has_host() && matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !valid {
        return (StatusCode::BAD_REQUEST, "bad URL provided").into_response();
    }

    let driver = state.driver.clone();
    let seed = raw.clone();
    tokio::spawn(async move {
        driver.crawl(&seed).await;
    });

    (
        StatusCode::ACCEPTED,
        format!("crawl has been queued for {raw}"),
    )
        .into_response()
}

/// `GET /stats` — index plus cache statistics.
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        index: state.index.stats(),
        cache: state.index.cache_info(),
    })
}

/// `GET /health`.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `POST /cache/clear`.
pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.index.clear_cache();
    Json(StatusMessage::success("cache cleared successfully"))
}

/// `POST /cache/prewarm` — runs in the background.
pub async fn prewarm_cache(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.index.clone();
    tokio::task::spawn_blocking(move || index.prewarm_cache());
    Json(StatusMessage::success("cache prewarming started"))
}

/// `POST /cache/optimize` — runs in the background.
pub async fn optimize_cache(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.index.clone();
    tokio::task::spawn_blocking(move || index.optimize_cache());
    Json(StatusMessage::success("cache optimization started"))
}
