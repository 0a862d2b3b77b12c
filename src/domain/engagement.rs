use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a like toggle, consumed by asynchronous partial page updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeSummary {
    pub like_count: i64,
    pub tweet_id: Uuid,
}
