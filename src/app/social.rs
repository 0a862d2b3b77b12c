use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::users::user_from_row;
use crate::domain::social_graph::FollowEdge;
use crate::domain::user::{Profile, User};
use crate::infra::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
    SelfUnfollow,
}

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The insert is the authority on duplicates: a concurrent follow that
    /// loses the race affects zero rows and reports `AlreadyFollowing`.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<FollowOutcome> {
        if follower_id == following_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, following_id, created_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<UnfollowOutcome> {
        if follower_id == following_id {
            return Ok(UnfollowOutcome::SelfUnfollow);
        }

        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2")
            .bind(follower_id)
            .bind(following_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    /// Accounts that follow `user_id`, oldest edge first.
    pub async fn list_followers(&self, user_id: Uuid) -> Result<Vec<FollowEdge>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.email, u.age, u.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = ?1 \
             ORDER BY f.rowid",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| FollowEdge {
                user: user_from_row(row),
                followed_at: row.get("followed_at"),
            })
            .collect())
    }

    /// Accounts that `user_id` follows, oldest edge first.
    pub async fn list_following(&self, user_id: Uuid) -> Result<Vec<FollowEdge>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.email, u.age, u.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = ?1 \
             ORDER BY f.rowid",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| FollowEdge {
                user: user_from_row(row),
                followed_at: row.get("followed_at"),
            })
            .collect())
    }

    pub async fn profile(&self, viewer_id: Uuid, user: User) -> Result<Profile> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM follows WHERE following_id = ?1) AS follower_count, \
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1) AS following_count, \
                EXISTS (SELECT 1 FROM follows WHERE follower_id = ?2 AND following_id = ?1) AS is_following",
        )
        .bind(user.id)
        .bind(viewer_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Profile {
            user: user.into(),
            follower_count: row.get("follower_count"),
            following_count: row.get("following_count"),
            is_following: row.get("is_following"),
        })
    }
}
