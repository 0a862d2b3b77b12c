use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::domain::tweet::{Tweet, TweetDetail};
use crate::infra::db::Db;

pub(crate) const TWEET_SELECT: &str = "SELECT t.id, t.user_id, u.username, t.content, t.created_at \
     FROM tweets t \
     JOIN users u ON u.id = t.user_id";

pub(crate) fn tweet_from_row(row: &SqliteRow) -> Tweet {
    Tweet {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

#[derive(Clone)]
pub struct TweetService {
    db: Db,
}

impl TweetService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `content` must already be validated; the table's CHECK constraint
    /// rejects anything empty or longer than 140 characters.
    pub async fn create_tweet(&self, user_id: Uuid, content: String) -> Result<Tweet> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO tweets (id, content, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(content)
        .bind(user_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.db.pool())
        .await?;

        self.get_tweet(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("tweet {} missing after insert", id))
    }

    pub async fn get_tweet(&self, tweet_id: Uuid) -> Result<Option<Tweet>> {
        let row = sqlx::query(&format!("{} WHERE t.id = ?1", TWEET_SELECT))
            .bind(tweet_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(tweet_from_row))
    }

    pub async fn owner_of(&self, tweet_id: Uuid) -> Result<Option<Uuid>> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM tweets WHERE id = ?1")
            .bind(tweet_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(owner)
    }

    pub async fn get_detail(&self, tweet_id: Uuid, viewer_id: Uuid) -> Result<Option<TweetDetail>> {
        let Some(tweet) = self.get_tweet(tweet_id).await? else {
            return Ok(None);
        };

        let engagement = EngagementService::new(self.db.clone());
        let like_count = engagement.like_count(tweet_id).await?;
        let liked = engagement.has_liked(viewer_id, tweet_id).await?;

        Ok(Some(TweetDetail {
            tweet,
            like_count,
            liked,
        }))
    }

    /// Ownership is part of the delete predicate, so a non-owner can never
    /// remove the row even if it changes hands between checks.
    pub async fn delete_tweet(&self, tweet_id: Uuid, owner_id: Uuid) -> Result<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM tweets WHERE id = ?1 AND user_id = ?2")
            .bind(tweet_id)
            .bind(owner_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            return Ok(DeleteOutcome::Deleted);
        }

        match self.owner_of(tweet_id).await? {
            Some(_) => Ok(DeleteOutcome::NotOwner),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    /// Newest first. `created_at` is stamped at insert, so rowid order matches it.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Tweet>> {
        let rows = sqlx::query(&format!(
            "{} WHERE t.user_id = ?1 ORDER BY t.rowid DESC",
            TWEET_SELECT
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }
}
