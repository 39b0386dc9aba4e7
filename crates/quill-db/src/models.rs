//! Row encoding shared by the primary and secondary stores.
//!
//! Ids are stored as hyphenated UUID text. Timestamps are RFC 3339 UTC with a
//! fixed microsecond precision so that lexical order in SQL matches
//! chronological order.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use quill_types::models::{AuthorStat, Comment, Post};

/// Collation used for alphabetical post listing.
pub const TITLE_COLLATION: &str = "title_ci";

pub fn register_collations(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_collation(TITLE_COLLATION, compare_titles)
}

thread_local! {
    // SQLite calls the collation on whichever thread runs the query.
    static TITLE_COLLATOR: Option<Collator> =
        Collator::try_new(&locale!("en").into(), CollatorOptions::new()).ok();
}

/// English-locale Unicode collation: letters compare first, then accents,
/// then case. Titles that still collate equal are ordered by their raw text
/// so the order is total.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    TITLE_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
        })
        .then_with(|| a.cmp(b))
}

pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn decode_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Expects `id, title, content, author, created_at, updated_at`.
pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: decode_id(row, 0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author: row.get(3)?,
        created_at: decode_ts(row, 4)?,
        updated_at: decode_ts(row, 5)?,
    })
}

/// Expects `id, post_id, commenter, comment, created_at`.
pub(crate) fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: decode_id(row, 0)?,
        post_id: decode_id(row, 1)?,
        commenter: row.get(2)?,
        comment: row.get(3)?,
        created_at: decode_ts(row, 4)?,
    })
}

/// Expects `author, post_count, updated_at`.
pub(crate) fn author_stat_from_row(row: &Row<'_>) -> rusqlite::Result<AuthorStat> {
    Ok(AuthorStat {
        author: row.get(0)?,
        post_count: row.get(1)?,
        updated_at: decode_ts(row, 2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn titles_compare_without_regard_to_case() {
        assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_titles("Zebra", "mango"), Ordering::Greater);
        assert_eq!(compare_titles("same", "same"), Ordering::Equal);
        assert_ne!(compare_titles("Éclair", "éclair"), Ordering::Equal);
    }

    #[test]
    fn accented_titles_sort_with_their_base_letter() {
        assert_eq!(compare_titles("apple", "Éclair"), Ordering::Less);
        assert_eq!(compare_titles("Éclair", "Mango"), Ordering::Less);
        assert_eq!(compare_titles("eclair", "éclair"), Ordering::Less);
        assert_eq!(compare_titles("Ångström", "Zebra"), Ordering::Less);
    }

    #[test]
    fn encoded_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let a = encode_ts(&early);
        let b = encode_ts(&late);
        assert_eq!(a, "2024-01-01T09:00:00.000000Z");
        assert!(a < b);
    }
}
