//! Session token transport: the `sessionid` cookie or a bearer header.

use axum::http::{header, HeaderMap, HeaderValue};
use url::form_urlencoded;

pub const SESSION_COOKIE: &str = "sessionid";

/// Bearer tokens win over cookies when both are sent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, SESSION_COOKIE))
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.trim_matches('"').to_string())
    })
}

pub fn session_cookie(token: &str, max_age_seconds: u64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    let cookie = if secure {
        "sessionid=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0; Secure"
    } else {
        "sessionid=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"
    };
    HeaderValue::from_static(cookie)
}

/// Only same-site absolute paths are honoured as post-login destinations.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let safe = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    safe.then(|| next.to_string())
}

pub fn login_redirect_location(login_url: &str, next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{}?{}", login_url, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=v4.local.abc; lang=ja"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("v4.local.abc"));
    }

    #[test]
    fn bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid=cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn empty_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn next_must_be_local_path() {
        assert_eq!(safe_next(Some("/tweets/create/")).as_deref(), Some("/tweets/create/"));
        assert_eq!(safe_next(Some("//evil.example/")), None);
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn login_location_encodes_next() {
        assert_eq!(
            login_redirect_location("/accounts/login/", "/tweets/create/?a=1&b=2"),
            "/accounts/login/?next=%2Ftweets%2Fcreate%2F%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn secure_cookie_flag() {
        let cookie = session_cookie("tok", 60, true).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "sessionid=tok; HttpOnly; Path=/; SameSite=Lax; Max-Age=60; Secure"
        );
    }
}
