use serde::{Deserialize, Serialize};

// -- Forms --

/// Fields are optional so a missing field can be reported as a 400 instead
/// of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    pub commenter: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
}

// -- Stats --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub posts: u64,
    pub comments: u64,
}

/// Secondary side of `/api/stats`: either counts or the reason they could
/// not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecondaryStats {
    Counts(StoreCounts),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub primary: StoreCounts,
    pub secondary: SecondaryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_secondary_serializes_as_error_object() {
        let stats = StoreStats {
            primary: StoreCounts { posts: 2, comments: 3 },
            secondary: SecondaryStats::Error {
                error: "secondary store unavailable".into(),
            },
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["primary"]["posts"], 2);
        assert_eq!(json["primary"]["comments"], 3);
        assert_eq!(json["secondary"]["error"], "secondary store unavailable");
        assert!(json["secondary"].get("posts").is_none());
    }

    #[test]
    fn reachable_secondary_serializes_flat_counts() {
        let stats = StoreStats {
            primary: StoreCounts::default(),
            secondary: SecondaryStats::Counts(StoreCounts { posts: 1, comments: 0 }),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["secondary"]["posts"], 1);
        assert_eq!(json["secondary"]["comments"], 0);
    }
}
