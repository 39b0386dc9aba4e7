use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::render;

pub type Result<T> = std::result::Result<T, BlogError>;

/// Failures surfaced by the blog service. Secondary-store problems are never
/// represented here; they are reported through `MirrorStatus`.
#[derive(Debug, Error)]
pub enum BlogError {
    /// Unknown or malformed identifier. The two are not distinguished.
    #[error("not found")]
    NotFound,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("primary store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 302 to `location`, the redirect every page route answers with.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Page routes: unknown ids and internal failures both send the user home,
/// but internal failures are logged with their cause first.
impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        match self {
            BlogError::NotFound => found("/"),
            BlogError::MissingField(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            BlogError::Store(_) | BlogError::Task(_) => {
                error!("Request failed: {}", self);
                found("/")
            }
        }
    }
}

/// Error for `GET /`. Every other page falls back to home, so home itself
/// answers internal failures with a 500 page rather than redirecting to
/// itself.
#[derive(Debug)]
pub struct HomeError(pub BlogError);

impl From<BlogError> for HomeError {
    fn from(err: BlogError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HomeError {
    fn into_response(self) -> Response {
        match self.0 {
            err @ (BlogError::Store(_) | BlogError::Task(_)) => {
                error!("Home page failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(render::error_page("The blog is temporarily unavailable.")),
                )
                    .into_response()
            }
            err => err.into_response(),
        }
    }
}

/// Unwraps a required form field. Empty strings are accepted as given.
pub fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value.ok_or(BlogError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_redirects_home() {
        let resp = BlogError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/");
    }

    #[test]
    fn missing_field_is_a_client_error() {
        let resp = BlogError::MissingField("title").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_still_redirects() {
        let resp = BlogError::Store(anyhow::anyhow!("disk full")).into_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[test]
    fn home_page_store_failure_is_a_server_error() {
        let resp = HomeError(BlogError::Store(anyhow::anyhow!("disk full"))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(header::LOCATION).is_none());

        let resp = HomeError(BlogError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[test]
    fn required_reports_the_field_name() {
        assert_eq!(required(Some("x".into()), "title").unwrap(), "x");
        let err = required(None, "author").unwrap_err();
        assert_eq!(err.to_string(), "missing required field: author");
    }
}
