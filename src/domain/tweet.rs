use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_TWEET_CHARS: usize = 140;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct TweetDetail {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub like_count: i64,
    pub liked: bool,
}
