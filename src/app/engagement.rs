use anyhow::Result;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::LikeSummary;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Idempotent: repeating the call leaves a single like in place.
    /// Returns `None` when the tweet does not exist.
    ///
    /// The existence check is part of the insert, so a tweet deleted
    /// concurrently yields `None` rather than a foreign-key failure.
    pub async fn like_tweet(&self, user_id: Uuid, tweet_id: Uuid) -> Result<Option<LikeSummary>> {
        let result = sqlx::query(
            "INSERT INTO likes (user_id, tweet_id, created_at) \
             SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM tweets WHERE id = ?2) \
             ON CONFLICT (user_id, tweet_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(tweet_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 && !self.tweet_exists(tweet_id).await? {
            return Ok(None);
        }

        self.summary(tweet_id).await.map(Some)
    }

    /// Removing a like that was never there is not an error.
    pub async fn unlike_tweet(&self, user_id: Uuid, tweet_id: Uuid) -> Result<Option<LikeSummary>> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ?1 AND tweet_id = ?2")
            .bind(user_id)
            .bind(tweet_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 && !self.tweet_exists(tweet_id).await? {
            return Ok(None);
        }

        self.summary(tweet_id).await.map(Some)
    }

    pub async fn like_count(&self, tweet_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE tweet_id = ?1")
            .bind(tweet_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn has_liked(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool> {
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = ?1 AND tweet_id = ?2)",
        )
        .bind(user_id)
        .bind(tweet_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(liked)
    }

    async fn tweet_exists(&self, tweet_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tweets WHERE id = ?1)")
            .bind(tweet_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    async fn summary(&self, tweet_id: Uuid) -> Result<LikeSummary> {
        Ok(LikeSummary {
            like_count: self.like_count(tweet_id).await?,
            tweet_id,
        })
    }
}
