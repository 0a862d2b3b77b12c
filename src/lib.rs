pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::auth::AuthService;
use crate::config::AppConfig;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub login_url: String,
    pub login_redirect_url: String,
    pub cookie_secure: bool,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(db: Db, config: &AppConfig) -> Self {
        Self {
            db,
            session_key: config.paseto_session_key,
            session_ttl_hours: config.session_ttl_hours,
            login_url: config.login_url.clone(),
            login_redirect_url: config.login_redirect_url.clone(),
            cookie_secure: config.cookie_secure,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.session_key, self.session_ttl_hours)
    }
}
