use anyhow::Result;

use crate::app::tweets::{tweet_from_row, TWEET_SELECT};
use crate::domain::tweet::Tweet;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Every account's tweets, newest first, with the author joined in.
    pub async fn home_timeline(&self) -> Result<Vec<Tweet>> {
        let rows = sqlx::query(&format!("{} ORDER BY t.rowid DESC", TWEET_SELECT))
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }
}
