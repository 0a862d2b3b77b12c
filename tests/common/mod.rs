#![allow(dead_code)]

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::PathBuf;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use chirp::config::{decode_key_32, AppConfig};
use chirp::infra::db::Db;
use chirp::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes), test-only
const TEST_SESSION_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const DEFAULT_PASSWORD: &str = "pass0000";

// ---------------------------------------------------------------------------
// TestApp: one fresh in-memory database per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: Option<PathBuf>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(path) = &self.db_file {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
            }
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn location(&self) -> Option<String> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// The `sessionid` value from `Set-Cookie`, if one was issued.
    pub fn session_token(&self) -> Option<String> {
        let cookie = self.headers.get(header::SET_COOKIE)?.to_str().ok()?;
        let value = cookie.strip_prefix("sessionid=")?.split(';').next()?;
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn messages(&self) -> Vec<String> {
        self.json()["messages"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["message"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn form_errors(&self, field: &str) -> Vec<String> {
        self.json()["errors"][field]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        http_addr: "127.0.0.1:0".into(),
        database_url: "sqlite::memory:".into(),
        // A single connection keeps the in-memory database shared and alive.
        db_max_connections: 1,
        db_connect_timeout_seconds: 30,
        db_idle_timeout_seconds: 0,
        db_max_lifetime_seconds: 0,
        paseto_session_key: decode_key_32("PASETO_SESSION_KEY", TEST_SESSION_KEY)
            .expect("test key must decode"),
        session_ttl_hours: 24,
        login_url: "/accounts/login/".into(),
        login_redirect_url: "/accounts/home/".into(),
        cookie_secure: false,
        max_body_bytes: 65536,
    }
}

pub async fn app() -> TestApp {
    TestApp::setup(test_config(), None).await
}

/// A temporary on-disk database with a real pool, for tests that need
/// requests to hit SQLite on separate connections at the same time.
pub async fn file_backed_app(max_connections: u32) -> TestApp {
    let path = std::env::temp_dir().join(format!("chirp-test-{}.db", Uuid::new_v4()));
    let mut config = test_config();
    config.database_url = format!("sqlite://{}?mode=rwc", path.display());
    config.db_max_connections = max_connections;
    TestApp::setup(config, Some(path)).await
}

impl TestApp {
    async fn setup(config: AppConfig, db_file: Option<PathBuf>) -> Self {
        let db = Db::connect(&config).await.expect("Db::connect failed");
        let state = AppState::new(db, &config);
        let router = chirp::http::router(state.clone());
        TestApp {
            router,
            state,
            db_file,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("sessionid={}", token));
        }

        let request = match form {
            Some(fields) => {
                let body = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                builder
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        token: Option<&str>,
    ) -> TestResponse {
        self.request(Method::POST, path, Some(fields), token).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(&[]), token).await
    }

    pub async fn get_bearer(&self, path: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.expect("oneshot failed");
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Insert a user directly and open a session for it.
    pub async fn create_user(&self, username: &str) -> TestUser {
        let email = format!("{}@example.com", username);

        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let hash = Argon2::default()
            .hash_password(DEFAULT_PASSWORD.as_bytes(), &salt)
            .expect("password hash failed")
            .to_string();

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(username)
        .bind(&email)
        .bind(&hash)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .expect("insert test user failed");

        let session = self
            .state
            .auth_service()
            .issue_session(id)
            .await
            .expect("issue_session failed");

        TestUser {
            id,
            username: username.to_string(),
            email,
            token: session.token,
        }
    }

    pub async fn create_tweet(&self, user_id: Uuid, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO tweets (id, content, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(content)
        .bind(user_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .expect("insert test tweet failed");
        id
    }

    pub async fn follow_directly(&self, follower_id: Uuid, following_id: Uuid) {
        sqlx::query(
            "INSERT INTO follows (follower_id, following_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .expect("insert test follow failed");
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.pool())
            .await
            .expect("count failed")
    }

    pub async fn follow_exists(&self, follower_id: Uuid, following_id: Uuid) -> bool {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(self.pool())
        .await
        .expect("follow lookup failed")
    }

    pub fn pool(&self) -> &SqlitePool {
        self.state.db.pool()
    }
}
