use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub paseto_session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub login_url: String,
    pub login_redirect_url: String,
    pub cookie_secure: bool,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let login_url = env_or("LOGIN_URL", "/accounts/login/");
        let login_redirect_url = env_or("LOGIN_REDIRECT_URL", "/accounts/home/");
        for (key, value) in [("LOGIN_URL", &login_url), ("LOGIN_REDIRECT_URL", &login_redirect_url)] {
            if !value.starts_with('/') {
                return Err(anyhow!("invalid {}: must be an absolute path", key));
            }
        }

        Ok(Self {
            http_addr,
            database_url: env_or("DATABASE_URL", "sqlite://chirp.db?mode=rwc"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "10")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            paseto_session_key: decode_key_32("PASETO_SESSION_KEY", &env_or_err("PASETO_SESSION_KEY")?)?,
            session_ttl_hours: env_or_parse("SESSION_TTL_HOURS", "336")?,
            login_url,
            login_redirect_url,
            cookie_secure: env_or_parse("COOKIE_SECURE", "false")?,
            max_body_bytes: env_or_parse("MAX_BODY_BYTES", "65536")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &value)
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

pub fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
