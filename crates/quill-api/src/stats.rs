use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;

use quill_types::api::StoreStats;
use quill_types::models::Post;

use crate::AppState;

/// GET /api/author-stats — the stored ledger, author -> post count.
pub async fn author_stats(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, i64>>, StatusCode> {
    let counts = state.author_post_counts().await.map_err(|e| {
        error!("Failed to read author stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(counts))
}

/// GET /api/stats — post and comment counts from both stores.
pub async fn store_stats(State(state): State<AppState>) -> Result<Json<StoreStats>, StatusCode> {
    let stats = state.store_stats().await.map_err(|e| {
        error!("Failed to read store stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(stats))
}

pub async fn author_posts(
    State(state): State<AppState>,
    Path(author): Path<String>,
) -> Result<Json<Vec<Post>>, StatusCode> {
    let posts = state.posts_by_author(&author).await.map_err(|e| {
        error!("Failed to list posts for {}: {}", author, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(posts))
}

pub async fn health() -> &'static str {
    "ok"
}
