//! Request handlers for the search and details endpoints
//!
//! Both endpoints follow the same path: derive the key, answer from the cache
//! on a hit, otherwise fetch upstream, store the body and answer with it. A
//! failed fetch is reported to the caller and nothing is stored.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use super::error::ApiError;
use super::AppState;
use crate::cache::{detail_key, search_key, NamespaceCache, Payload};
use crate::upstream::UpstreamClient;

/// Body of `POST /tv/search`
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text show title; must not be empty
    pub query: String,
}

/// Body of `POST /tv/details`
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailsRequest {
    /// TMDB TV show id; must not be 0
    pub id: i64,
}

/// Body of `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is answering
    pub status: String,
    /// Entries currently held in the search namespace
    pub search_entries: usize,
    /// Entries currently held in the details namespace
    pub details_entries: usize,
}

/// POST /tv/search
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.query.is_empty() {
        return Err(ApiError::Validation("query is required".to_string()));
    }

    let key = search_key(&request.query);
    let url = state.upstream.search_url(&request.query);
    let payload = cached_fetch(&state.search, &state.upstream, key, url).await?;

    Ok(json_response(payload))
}

/// POST /tv/details
pub async fn details(
    State(state): State<AppState>,
    body: Result<Json<DetailsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.id == 0 {
        return Err(ApiError::Validation("id is required".to_string()));
    }

    let key = detail_key(request.id);
    let url = state.upstream.detail_url(request.id);
    let payload = cached_fetch(&state.details, &state.upstream, key, url).await?;

    Ok(json_response(payload))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        search_entries: state.search.len().await,
        details_entries: state.details.len().await,
    })
}

/// Serves `key` from `cache`, fetching `url` and storing the result on a miss.
///
/// The fetch runs without holding the table lock; concurrent misses for the
/// same key may both reach upstream, and the later insert wins.
async fn cached_fetch(
    cache: &NamespaceCache,
    upstream: &UpstreamClient,
    key: String,
    url: Url,
) -> Result<Payload, ApiError> {
    let namespace = cache.namespace();

    if let Some(payload) = cache.get(&key).await {
        debug!(%namespace, key = %key, "Cache hit");
        return Ok(payload);
    }

    info!(%namespace, key = %key, "Cache miss, fetching {}", url);
    let body = upstream.fetch(url).await.map_err(|e| {
        error!(%namespace, key = %key, error = %e, "Upstream fetch failed");
        e
    })?;
    let payload = Payload::from_body(&body)?;

    // The entry stays in memory even if persisting it fails
    if let Err(e) = cache.insert(key.clone(), payload.clone()).await {
        warn!(%namespace, key = %key, error = %e, "Failed to persist cache");
    }

    Ok(payload)
}

fn json_response(payload: Payload) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        payload.as_str().to_owned(),
    )
        .into_response()
}
