use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use quill_types::api::StoreCounts;
use quill_types::models::{AuthorStat, Comment, Post, PostSort};

use crate::Database;
use crate::models::{
    TITLE_COLLATION, author_stat_from_row, comment_from_row, encode_ts, post_from_row,
};

const POST_COLUMNS: &str = "id, title, content, author, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, commenter, comment, created_at";

impl Database {
    // -- Posts --

    /// Insert a post and bump its author's ledger row in one transaction.
    pub fn create_post(&self, post: &Post) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO posts (id, title, content, author, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    post.id.to_string(),
                    post.title,
                    post.content,
                    post.author,
                    encode_ts(&post.created_at),
                    encode_ts(&post.updated_at),
                ],
            )?;
            adjust_author_count(&tx, &post.author, 1, &post.created_at)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Overwrite title, content and author. The ledger is left alone even
    /// when the author changes. Returns the stored post, or `None` if no
    /// post has this id.
    pub fn update_post(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        author: &str,
        updated_at: &DateTime<Utc>,
    ) -> Result<Option<Post>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?1, content = ?2, author = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![title, content, author, encode_ts(updated_at), id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_post(conn, id)
        })
    }

    /// Remove a post, its comments and one unit of its author's count.
    /// Returns the deleted post, or `None` (and changes nothing) if absent.
    pub fn delete_post(&self, id: Uuid, now: &DateTime<Utc>) -> Result<Option<Post>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(post) = query_post(&tx, id)? else {
                return Ok(None);
            };

            let key = id.to_string();
            tx.execute("DELETE FROM posts WHERE id = ?1", [&key])?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [&key])?;
            adjust_author_count(&tx, &post.author, -1, now)?;
            tx.commit()?;
            Ok(Some(post))
        })
    }

    pub fn list_posts(&self, sort: PostSort) -> Result<Vec<Post>> {
        let order = match sort {
            PostSort::DateDesc => "created_at DESC, rowid DESC".to_string(),
            PostSort::DateAsc => "created_at ASC, rowid ASC".to_string(),
            PostSort::Title => format!("title COLLATE {} ASC, created_at DESC", TITLE_COLLATION),
        };
        let sql = format!("SELECT {} FROM posts ORDER BY {}", POST_COLUMNS, order);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn posts_by_author(&self, author: &str) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM posts WHERE author = ?1 ORDER BY created_at DESC, rowid DESC",
                POST_COLUMNS
            ))?;
            let rows = stmt
                .query_map([author], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    /// The referenced post is not checked.
    pub fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, commenter, comment, created_at)
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

    /// Newest first.
    pub fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at DESC, rowid DESC",
                COMMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([post_id.to_string()], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every comment, oldest first. Used to copy the store wholesale.
    pub fn all_comments(&self) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments ORDER BY created_at ASC, rowid ASC",
                COMMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Author ledger --

    pub fn author_stats(&self) -> Result<Vec<AuthorStat>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT author, post_count, updated_at FROM author_stats ORDER BY author")?;
            let rows = stmt
                .query_map([], author_stat_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Reads the ledger as stored. Never recomputed from the posts table.
    pub fn author_post_counts(&self) -> Result<BTreeMap<String, i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT author, post_count FROM author_stats")?;
            let counts = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
            Ok(counts)
        })
    }

    // -- Stats --

    pub fn counts(&self) -> Result<StoreCounts> {
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

/// Single-statement upsert so concurrent writers never lose an update.
/// A missing row is created at zero before `delta` is applied.
fn adjust_author_count(
    conn: &Connection,
    author: &str,
    delta: i64,
    now: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO author_stats (author, post_count, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(author) DO UPDATE SET
             post_count = post_count + excluded.post_count,
             updated_at = excluded.updated_at",
        rusqlite::params![author, delta, encode_ts(now)],
    )?;
    Ok(())
}

fn query_post(conn: &Connection, id: Uuid) -> Result<Option<Post>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS))?;
    let row = stmt.query_row([id.to_string()], post_from_row).optional()?;
    Ok(row)
}
