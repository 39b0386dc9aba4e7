use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, Response},
};

use quill_types::api::{ListQuery, PostForm};
use quill_types::models::PostSort;

use crate::AppState;
use crate::error::{BlogError, HomeError, Result, found, required};
use crate::render;

struct PostFields {
    title: String,
    content: String,
    author: String,
}

fn post_fields(form: PostForm) -> Result<PostFields> {
    Ok(PostFields {
        title: required(form.title, "title")?,
        content: required(form.content, "content")?,
        author: required(form.author, "author")?,
    })
}

/// GET / — post list plus the author ledger.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> std::result::Result<Html<String>, HomeError> {
    let sort = PostSort::from_query(query.sort.as_deref());
    let posts = state.list_posts(sort).await?;
    let counts = state.author_post_counts().await?;
    Ok(Html(render::index_page(&posts, sort, &counts)))
}

pub async fn create_form() -> Html<String> {
    Html(render::create_page())
}

/// POST /create
pub async fn create_post(
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let fields = post_fields(form)?;
    state
        .create_post(fields.title, fields.content, fields.author)
        .await?;
    Ok(found("/"))
}

/// GET /post/{id} — unknown and malformed ids both go home.
pub async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let post = state.get_post(&id).await?.ok_or(BlogError::NotFound)?;
    let comments = state.list_comments_for_post(&id).await?;
    Ok(Html(render::post_page(&post, &comments)))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let post = state.get_post(&id).await?.ok_or(BlogError::NotFound)?;
    Ok(Html(render::edit_page(&post)))
}

/// POST /edit/{id}
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let fields = post_fields(form)?;
    state
        .edit_post(&id, fields.title, fields.content, fields.author)
        .await?;
    Ok(found(&format!("/post/{}", id)))
}

/// POST /delete/{id} — deleting something that is not there still lands home.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    state.delete_post(&id).await?;
    Ok(found("/"))
}
