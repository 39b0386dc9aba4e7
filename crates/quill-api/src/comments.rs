use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};

use quill_types::api::CommentForm;

use crate::AppState;
use crate::error::{Result, found, required};

/// POST /post/{id}/comment
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let commenter = required(form.commenter, "commenter")?;
    let comment = required(form.comment, "comment")?;

    state.add_comment(&post_id, commenter, comment).await?;
    Ok(found(&format!("/post/{}", post_id)))
}
