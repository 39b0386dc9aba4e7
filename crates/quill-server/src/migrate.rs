//! One-shot copy of the primary store into the secondary, and a plain-text
//! listing of stored posts. Both back the `quill-admin` commands.

use anyhow::Result;
use tracing::warn;

use quill_db::{Database, MirrorStore};
use quill_types::models::{Post, PostSort};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub posts_copied: usize,
    pub posts_failed: usize,
    pub comments_copied: usize,
    pub comments_failed: usize,
}

/// Copy every post and comment. A row that fails to copy is logged and
/// counted; the rest still go through. Rerunning is safe because the
/// secondary upserts by id.
pub fn copy_to_secondary(db: &Database, mirror: &dyn MirrorStore) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for post in db.list_posts(PostSort::DateAsc)? {
        match mirror.upsert_post(&post) {
            Ok(()) => report.posts_copied += 1,
            Err(e) => {
                warn!("Failed to copy post {} ({}): {:#}", post.id, post.title, e);
                report.posts_failed += 1;
            }
        }
    }

    for comment in db.all_comments()? {
        match mirror.upsert_comment(&comment) {
            Ok(()) => report.comments_copied += 1,
            Err(e) => {
                warn!("Failed to copy comment {}: {:#}", comment.id, e);
                report.comments_failed += 1;
            }
        }
    }

    Ok(report)
}

/// Content shortened to a preview, cut on a character boundary.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub fn describe_post(index: usize, post: &Post) -> String {
    format!(
        "Post {}:\n  Title: {}\n  Author: {}\n  Content: {}\n",
        index,
        post.title,
        post.author,
        preview(&post.content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quill_db::SqliteMirror;
    use quill_types::api::StoreCounts;
    use quill_types::models::Comment;

    #[test]
    fn preview_truncates_long_content_only() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(150);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview(&"x".repeat(100)), "x".repeat(100));
    }

    #[test]
    fn copy_is_complete_and_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("primary.db")).unwrap();
        let mirror = SqliteMirror::create(&dir.path().join("secondary.db")).unwrap();

        let post = Post::new("t".into(), "c".into(), "a".into(), Utc::now());
        db.create_post(&post).unwrap();
        db.create_post(&Post::new("u".into(), "c".into(), "b".into(), Utc::now())).unwrap();
        db.insert_comment(&Comment::new(post.id, "x".into(), "y".into(), Utc::now())).unwrap();

        let first = copy_to_secondary(&db, &mirror).unwrap();
        assert_eq!(
            first,
            MigrationReport {
                posts_copied: 2,
                posts_failed: 0,
                comments_copied: 1,
                comments_failed: 0,
            }
        );

        copy_to_secondary(&db, &mirror).unwrap();
        assert_eq!(mirror.counts().unwrap(), StoreCounts { posts: 2, comments: 1 });
    }
}
