//! Post/comment orchestration and the read-side query façade.
//!
//! Every write goes to the primary store first. If that succeeds, the same
//! write is offered to the secondary store, bounded by `mirror_timeout`. The
//! mirror outcome is reported alongside the primary result and never turns a
//! successful write into an error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use quill_db::{Database, MirrorStore};
use quill_types::api::{SecondaryStats, StoreStats};
use quill_types::models::{Comment, Post, PostSort};

use crate::error::{BlogError, Result};

pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_millis(2000);

/// Secondary calls allowed to run at once, counting ones whose caller has
/// already timed out. Past this, writes skip the mirror instead of queueing
/// on the blocking pool the primary also uses.
pub const MIRROR_MAX_IN_FLIGHT: usize = 8;

const MIRROR_BUSY: &str = "mirror busy";

/// What happened to the secondary copy of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStatus {
    Mirrored,
    /// The secondary returned an error or did not answer in time.
    Failed(String),
    /// No secondary store was connected at startup.
    Unavailable,
    /// The primary operation was a no-op, so nothing was sent.
    Skipped,
}

/// Result of a write that reached the primary store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome<T> {
    pub value: T,
    pub mirror: MirrorStatus,
}

pub struct BlogService {
    db: Arc<Database>,
    mirror: Option<Arc<dyn MirrorStore>>,
    mirror_timeout: Duration,
    mirror_slots: Arc<Semaphore>,
}

impl BlogService {
    pub fn new(
        db: Arc<Database>,
        mirror: Option<Arc<dyn MirrorStore>>,
        mirror_timeout: Duration,
    ) -> Self {
        if mirror.is_none() {
            info!("Running without a secondary store; writes will not be mirrored");
        }
        Self {
            db,
            mirror,
            mirror_timeout,
            mirror_slots: Arc::new(Semaphore::new(MIRROR_MAX_IN_FLIGHT)),
        }
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    // -- Writes --

    pub async fn create_post(
        &self,
        title: String,
        content: String,
        author: String,
    ) -> Result<WriteOutcome<Uuid>> {
        let post = Post::new(title, content, author, now());
        let id = post.id;

        let stored = post.clone();
        self.primary(move |db| db.create_post(&stored)).await?;
        debug!("Created post {} by {}", id, post.author);

        let mirror = self.mirror("create_post", move |m| m.upsert_post(&post)).await;
        Ok(WriteOutcome { value: id, mirror })
    }

    /// Leaves the author ledger untouched even when `author` changes.
    pub async fn edit_post(
        &self,
        id: &str,
        title: String,
        content: String,
        author: String,
    ) -> Result<WriteOutcome<()>> {
        let id = parse_id(id).ok_or(BlogError::NotFound)?;
        let updated_at = now();

        let post = self
            .primary(move |db| db.update_post(id, &title, &content, &author, &updated_at))
            .await?
            .ok_or(BlogError::NotFound)?;

        let mirror = self.mirror("edit_post", move |m| m.upsert_post(&post)).await;
        Ok(WriteOutcome { value: (), mirror })
    }

    /// Deletes the post and its comments. An unknown or malformed id is a
    /// silent no-op reported as `false`.
    pub async fn delete_post(&self, id: &str) -> Result<WriteOutcome<bool>> {
        let Some(id) = parse_id(id) else {
            return Ok(WriteOutcome {
                value: false,
                mirror: MirrorStatus::Skipped,
            });
        };
        let at = now();

        let deleted = self.primary(move |db| db.delete_post(id, &at)).await?;
        let Some(post) = deleted else {
            return Ok(WriteOutcome {
                value: false,
                mirror: MirrorStatus::Skipped,
            });
        };
        debug!("Deleted post {} by {}", post.id, post.author);

        let mirror = self.mirror("delete_post", move |m| m.delete_post(id)).await;
        Ok(WriteOutcome { value: true, mirror })
    }

    /// The post is not required to exist.
    pub async fn add_comment(
        &self,
        post_id: &str,
        commenter: String,
        comment: String,
    ) -> Result<WriteOutcome<Uuid>> {
        let post_id = parse_id(post_id).ok_or(BlogError::NotFound)?;
        let comment = Comment::new(post_id, commenter, comment, now());
        let id = comment.id;

        let stored = comment.clone();
        self.primary(move |db| db.insert_comment(&stored)).await?;

        let mirror = self
            .mirror("add_comment", move |m| m.upsert_comment(&comment))
            .await;
        Ok(WriteOutcome { value: id, mirror })
    }

    // -- Reads --

    pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        self.primary(move |db| db.get_post(id)).await
    }

    pub async fn list_posts(&self, sort: PostSort) -> Result<Vec<Post>> {
        self.primary(move |db| db.list_posts(sort)).await
    }

    pub async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        let Some(post_id) = parse_id(post_id) else {
            return Ok(Vec::new());
        };
        self.primary(move |db| db.comments_for_post(post_id)).await
    }

    pub async fn posts_by_author(&self, author: &str) -> Result<Vec<Post>> {
        let author = author.to_string();
        self.primary(move |db| db.posts_by_author(&author)).await
    }

    /// Straight from the ledger, not recomputed from posts.
    pub async fn author_post_counts(&self) -> Result<BTreeMap<String, i64>> {
        self.primary(|db| db.author_post_counts()).await
    }

    /// Raw counts from both stores, for spotting mirror divergence by eye.
    pub async fn store_stats(&self) -> Result<StoreStats> {
        let primary = self.primary(|db| db.counts()).await?;

        let secondary = match self.mirror.clone() {
            None => SecondaryStats::Error {
                error: "secondary store unavailable".to_string(),
            },
            Some(mirror) => self.secondary_counts(mirror).await,
        };

        Ok(StoreStats { primary, secondary })
    }

    // -- Plumbing --

    async fn secondary_counts(&self, mirror: Arc<dyn MirrorStore>) -> SecondaryStats {
        let Some(permit) = self.mirror_slot() else {
            return SecondaryStats::Error {
                error: MIRROR_BUSY.to_string(),
            };
        };

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            mirror.counts()
        });
        match tokio::time::timeout(self.mirror_timeout, task).await {
            Ok(Ok(Ok(counts))) => SecondaryStats::Counts(counts),
            Ok(Ok(Err(e))) => SecondaryStats::Error {
                error: format!("{:#}", e),
            },
            Ok(Err(e)) => SecondaryStats::Error {
                error: e.to_string(),
            },
            Err(_) => SecondaryStats::Error {
                error: format!("timed out after {:?}", self.mirror_timeout),
            },
        }
    }

    /// A free mirror slot, or `None` while every slot is held.
    fn mirror_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.mirror_slots.clone().try_acquire_owned().ok()
    }

    async fn primary<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let value = tokio::task::spawn_blocking(move || f(&db)).await??;
        Ok(value)
    }

    /// Offer one write to the secondary store.
    ///
    /// The blocking call may keep running after the timeout fires, holding
    /// its slot until it returns. A write that timed out can therefore still
    /// land after a later write for the same record; a late `upsert_post`
    /// may bring back a post the secondary already deleted. When every slot
    /// is taken the write is not attempted at all.
    async fn mirror<F>(&self, op: &'static str, f: F) -> MirrorStatus
    where
        F: FnOnce(&dyn MirrorStore) -> anyhow::Result<()> + Send + 'static,
    {
        let Some(mirror) = self.mirror.clone() else {
            return MirrorStatus::Unavailable;
        };
        let Some(permit) = self.mirror_slot() else {
            warn!(
                "Secondary {} skipped: {} calls still in flight",
                op, MIRROR_MAX_IN_FLIGHT
            );
            return MirrorStatus::Failed(MIRROR_BUSY.to_string());
        };

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f(mirror.as_ref())
        });
        match tokio::time::timeout(self.mirror_timeout, task).await {
            Ok(Ok(Ok(()))) => {
                debug!("Mirrored {}", op);
                MirrorStatus::Mirrored
            }
            Ok(Ok(Err(e))) => {
                warn!("Secondary {} failed: {:#}", op, e);
                MirrorStatus::Failed(format!("{:#}", e))
            }
            Ok(Err(e)) => {
                warn!("Secondary {} task failed: {}", op, e);
                MirrorStatus::Failed(e.to_string())
            }
            Err(_) => {
                warn!("Secondary {} timed out after {:?}", op, self.mirror_timeout);
                MirrorStatus::Failed(format!("timed out after {:?}", self.mirror_timeout))
            }
        }
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

/// Truncated to what the store keeps, so a value read back compares equal.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
