pub mod migrations;
pub mod mirror;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

pub use mirror::{MirrorStore, SqliteMirror};

const READER_POOL_SIZE: usize = 4;

/// Primary store: the system of record for posts, comments and the author
/// ledger. One writer plus a small round-robin pool of read-only connections.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        models::register_collations(&writer)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            models::register_collations(&conn)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Primary store opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow::anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quill_types::models::{Comment, Post};

    #[test]
    fn comments_outlive_a_post_removed_out_of_band() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("primary.db")).unwrap();
        let post = Post::new("t".into(), "c".into(), "a".into(), Utc::now());
        db.create_post(&post).unwrap();
        db.insert_comment(&Comment::new(post.id, "u".into(), "hi".into(), Utc::now()))
            .unwrap();

        db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts", [])?;
            Ok(())
        })
        .unwrap();

        let mode: String = db
            .with_conn(|conn| Ok(conn.pragma_query_value(None, "journal_mode", |r| r.get(0))?))
            .unwrap();
        assert_eq!(mode, "wal");
        assert!(db.get_post(post.id).unwrap().is_none());
        assert_eq!(db.comments_for_post(post.id).unwrap().len(), 1);
    }
}
