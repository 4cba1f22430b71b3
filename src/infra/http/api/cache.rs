//! Cache administration handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use headway_api_types::{
    CacheActionResponse, CacheKeyEntry, CacheKeyListing, CacheStatusResponse, InvalidateRequest,
};
use serde::Deserialize;
use tracing::info;

use crate::application::cache_admin::{CacheStatus, format_expires_in};

use super::error::ApiError;
use super::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct KeyListParams {
    pub pattern: Option<String>,
}

pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.cache.status().await {
        CacheStatus::Connected(stats) => (
            StatusCode::OK,
            Json(CacheStatusResponse::Connected {
                status: "connected".to_string(),
                total_commands_processed: stats.total_commands_processed,
                keyspace_hits: stats.keyspace_hits,
                keyspace_misses: stats.keyspace_misses,
                hit_rate: stats.hit_rate(),
            }),
        ),
        CacheStatus::StatsUnavailable(error) => (
            StatusCode::OK,
            Json(CacheStatusResponse::StatsUnavailable {
                status: "connected".to_string(),
                message: "Connected but could not retrieve stats".to_string(),
                error,
            }),
        ),
        CacheStatus::Disconnected => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CacheStatusResponse::Disconnected {
                status: "disconnected".to_string(),
                message: "Cache is not available".to_string(),
            }),
        ),
    }
}

pub async fn clear(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    if !state.cache.clear().await {
        return Err(ApiError::cache_unavailable("Cache could not be cleared"));
    }
    info!(target = "headway::api::admin", "cache cleared by operator");
    Ok(Json(CacheActionResponse {
        success: true,
        message: "Cache cleared successfully".to_string(),
        deleted_count: None,
    }))
}

/// The body is parsed leniently so a missing or empty body reports the
/// missing pattern instead of a content-type rejection.
pub async fn invalidate(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: InvalidateRequest = if body.is_empty() {
        InvalidateRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            ApiError::bad_request("Request body must be JSON", Some(err.to_string()))
        })?
    };

    let pattern = request.pattern.unwrap_or_default();
    let deleted = state.cache.invalidate(&pattern).await?;
    Ok(Json(CacheActionResponse {
        success: true,
        message: format!("Invalidated {deleted} keys matching pattern"),
        deleted_count: Some(deleted),
    }))
}

pub async fn keys(
    State(state): State<ApiState>,
    Query(params): Query<KeyListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.cache.keys(params.pattern.as_deref()).await?;
    let keys: Vec<CacheKeyEntry> = listing
        .keys
        .into_iter()
        .map(|info| CacheKeyEntry {
            expires_in: format_expires_in(info.ttl),
            key: info.key,
            ttl: info.ttl,
        })
        .collect();

    Ok(Json(CacheKeyListing {
        total_keys: listing.total,
        showing: keys.len(),
        keys,
    }))
}

pub async fn warmup(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.cache.warmup().await?;
    info!(
        target = "headway::api::admin",
        wordpress_posts = report.wordpress_posts,
        articles = report.articles,
        products = report.products,
        team_members = report.team_members,
        "cache warm-up requested by operator"
    );
    Ok(Json(CacheActionResponse {
        success: true,
        message: "Cache warmed up successfully".to_string(),
        deleted_count: None,
    }))
}
