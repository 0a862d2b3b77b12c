use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::user::User;
use crate::infra::db::Db;

pub(crate) const USER_COLUMNS: &str = "id, username, email, age, created_at";

pub(crate) fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        age: row.get("age"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}
