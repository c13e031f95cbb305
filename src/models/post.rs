use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post document as stored in the `posts` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: u64,
    pub user_id: u64,
    pub content: String,
    #[serde(rename = "likeCount", default)]
    pub like_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Builds a fresh post with the schema defaults applied.
    pub fn new(id: u64, user_id: u64, content: String) -> Self {
        Self {
            id,
            user_id,
            content,
            like_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Fields a post update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub content: Option<String>,
    pub like_count: Option<u64>,
}

impl PostChanges {
    pub fn apply(self, post: &mut Post) {
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(like_count) = self.like_count {
            post.like_count = like_count;
        }
    }
}
