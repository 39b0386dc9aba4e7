//! Secondary store: a best-effort copy of the primary, kept for migration.
//!
//! Every write is an upsert keyed by the primary's ids, so replaying the same
//! post or comment is harmless.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::info;
use uuid::Uuid;

use quill_types::api::StoreCounts;
use quill_types::models::{Comment, Post};

use crate::models::encode_ts;

/// Upper bound on how long a mirror write waits for a locked database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(1);

/// Write target for mirrored operations. Implementations are blocking and
/// must be safe to call from several threads.
pub trait MirrorStore: Send + Sync {
    fn upsert_post(&self, post: &Post) -> Result<()>;

    /// Removes the post and every comment that references it.
    fn delete_post(&self, post_id: Uuid) -> Result<()>;

    fn upsert_comment(&self, comment: &Comment) -> Result<()>;

    fn counts(&self) -> Result<StoreCounts>;
}

pub struct SqliteMirror {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteMirror {
    /// Connect to an existing secondary store. Fails if the file is missing
    /// or its tables do not answer, which callers treat as "no mirror".
    pub fn probe(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("cannot open secondary store at {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let mirror = Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        };
        let counts = mirror.counts().context("secondary store schema check failed")?;
        info!(
            "Secondary store connected at {} ({} posts, {} comments)",
            path.display(),
            counts.posts,
            counts.comments
        );
        Ok(mirror)
    }

    /// Create the secondary store file and schema if needed.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS posts (
                post_id     TEXT PRIMARY KEY,
                title       TEXT,
                content     TEXT,
                author      TEXT,
                created_at  TEXT,
                updated_at  TEXT
            );

            CREATE TABLE IF NOT EXISTS comments (
                comment_id  TEXT PRIMARY KEY,
                post_id     TEXT,
                commenter   TEXT,
                comment     TEXT,
                created_at  TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id);
            CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author);
            ",
        )?;

        info!("Secondary store schema ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Secondary lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

impl MirrorStore for SqliteMirror {
    fn upsert_post(&self, post: &Post) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (post_id, title, content, author, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(post_id) DO UPDATE SET
                     title = excluded.title,
                     content = excluded.content,
                     author = excluded.author,
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    post.id.to_string(),
                    post.title,
                    post.content,
                    post.author,
                    encode_ts(&post.created_at),
                    encode_ts(&post.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    fn delete_post(&self, post_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let key = post_id.to_string();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM posts WHERE post_id = ?1", [&key])?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [&key])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_comment(&self, comment: &Comment) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO comments (comment_id, post_id, commenter, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    comment.id.to_string(),
                    comment.post_id.to_string(),
                    comment.commenter,
                    comment.comment,
                    encode_ts(&comment.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn counts(&self) -> Result<StoreCounts> {
        self.with_conn(|conn| {
            let posts: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?;
            let comments: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
            Ok(StoreCounts {
                posts: posts as u64,
                comments: comments as u64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn probe_refuses_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.db");
        assert!(SqliteMirror::probe(&missing).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn probe_refuses_file_without_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path).unwrap();
        assert!(SqliteMirror::probe(&path).is_err());
    }

    #[test]
    fn upserts_are_idempotent_and_delete_cascades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secondary.db");
        SqliteMirror::create(&path).unwrap();
        let mirror = SqliteMirror::probe(&path).unwrap();

        let mut post = Post::new("t".into(), "c".into(), "a".into(), Utc::now());
        mirror.upsert_post(&post).unwrap();
        post.title = "t2".into();
        mirror.upsert_post(&post).unwrap();

        let comment = Comment::new(post.id, "u".into(), "hi".into(), Utc::now());
        mirror.upsert_comment(&comment).unwrap();
        mirror.upsert_comment(&comment).unwrap();
        assert_eq!(mirror.counts().unwrap(), StoreCounts { posts: 1, comments: 1 });

        mirror.delete_post(post.id).unwrap();
        assert_eq!(mirror.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn failed_delete_leaves_post_and_comments_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secondary.db");
        SqliteMirror::create(&path).unwrap();
        let mirror = SqliteMirror::probe(&path).unwrap();

        let post = Post::new("t".into(), "c".into(), "a".into(), Utc::now());
        mirror.upsert_post(&post).unwrap();
        mirror
            .upsert_comment(&Comment::new(post.id, "u".into(), "hi".into(), Utc::now()))
            .unwrap();

        // Deleting comments fails mid-way, so the post delete must roll back.
        mirror
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER block_comment_delete BEFORE DELETE ON comments
                     BEGIN SELECT RAISE(ABORT, 'comments locked'); END;",
                )?;
                Ok(())
            })
            .unwrap();
        assert!(mirror.delete_post(post.id).is_err());
        assert_eq!(mirror.counts().unwrap(), StoreCounts { posts: 1, comments: 1 });
    }
}
