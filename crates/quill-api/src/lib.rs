pub mod comments;
pub mod error;
pub mod posts;
pub mod render;
pub mod service;
pub mod stats;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::service::BlogService;

pub type AppState = Arc<BlogService>;

/// All routes, without transport layers. The server adds tracing on top.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/create", get(posts::create_form).post(posts::create_post))
        .route("/post/{id}", get(posts::show_post))
        .route("/edit/{id}", get(posts::edit_form).post(posts::update_post))
        .route("/delete/{id}", post(posts::delete_post))
        .route("/post/{id}/comment", post(comments::add_comment))
        .route("/api/author-stats", get(stats::author_stats))
        .route("/api/stats", get(stats::store_stats))
        .route("/api/authors/{author}/posts", get(stats::author_posts))
        .route("/health", get(stats::health))
        .with_state(state)
}
