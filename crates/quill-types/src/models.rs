use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// A fresh post stamped with `now` for both timestamps.
    pub fn new(title: String, content: String, author: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            author,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comments reference their post by id only. Nothing enforces that the post
/// still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub commenter: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, commenter: String, comment: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            commenter,
            comment,
            created_at: now,
        }
    }
}

/// Denormalized per-author counter. Maintained incrementally on post
/// create/delete, so it can drift and may go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorStat {
    pub author: String,
    pub post_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Orderings the post list supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    DateDesc,
    DateAsc,
    /// Case-insensitive, Unicode-aware title order.
    Title,
}

impl PostSort {
    /// Maps the `?sort=` query value. Anything unrecognised falls back to
    /// newest first.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("alphabetical") => Self::Title,
            Some("date_asc") => Self::DateAsc,
            _ => Self::DateDesc,
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            Self::DateDesc => "date",
            Self::DateAsc => "date_asc",
            Self::Title => "alphabetical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_query_defaults_to_newest_first() {
        assert_eq!(PostSort::from_query(None), PostSort::DateDesc);
        assert_eq!(PostSort::from_query(Some("date")), PostSort::DateDesc);
        assert_eq!(PostSort::from_query(Some("bogus")), PostSort::DateDesc);
        assert_eq!(PostSort::from_query(Some("alphabetical")), PostSort::Title);
        assert_eq!(PostSort::from_query(Some("date_asc")), PostSort::DateAsc);
    }
}
