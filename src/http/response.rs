use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::forms::FormErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

/// One-shot notice shown to the user alongside a page or after a redirect.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub level: Level,
    pub message: String,
}

#[derive(Serialize)]
struct PageBody<T> {
    page: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<Message>,
    #[serde(flatten)]
    data: T,
}

/// A rendered view: always 200, page name plus view data.
pub struct Page<T> {
    name: &'static str,
    data: T,
    messages: Vec<Message>,
    set_cookie: Option<HeaderValue>,
}

impl<T: Serialize> Page<T> {
    pub fn new(name: &'static str, data: T) -> Self {
        Self {
            name,
            data,
            messages: Vec::new(),
            set_cookie: None,
        }
    }

    pub fn with_message(mut self, level: Level, message: impl Into<String>) -> Self {
        self.messages.push(Message {
            level,
            message: message.into(),
        });
        self
    }

    pub fn with_cookie(mut self, cookie: HeaderValue) -> Self {
        self.set_cookie = Some(cookie);
        self
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let body = Json(PageBody {
            page: self.name,
            messages: self.messages,
            data: self.data,
        });
        let mut response = (StatusCode::OK, body).into_response();
        if let Some(cookie) = self.set_cookie {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        response
    }
}

#[derive(Serialize)]
pub struct Empty {}

#[derive(Serialize)]
pub struct FormPage<I> {
    pub form: I,
    pub errors: FormErrors,
}

pub fn form_page<I: Serialize>(name: &'static str, form: I, errors: FormErrors) -> Page<FormPage<I>> {
    Page::new(name, FormPage { form, errors })
}

#[derive(Serialize)]
struct RedirectBody {
    location: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<Message>,
}

/// `302 Found` carrying any flash messages in the body.
pub struct Redirect {
    location: String,
    messages: Vec<Message>,
    set_cookie: Option<HeaderValue>,
}

impl Redirect {
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            messages: Vec::new(),
            set_cookie: None,
        }
    }

    pub fn with_message(mut self, level: Level, message: impl Into<String>) -> Self {
        self.messages.push(Message {
            level,
            message: message.into(),
        });
        self
    }

    pub fn with_cookie(mut self, cookie: HeaderValue) -> Self {
        self.set_cookie = Some(cookie);
        self
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let location = match HeaderValue::from_str(&self.location) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, location = %self.location, "invalid redirect location");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        let body = Json(RedirectBody {
            location: self.location,
            messages: self.messages,
        });
        let mut response = (StatusCode::FOUND, body).into_response();
        response.headers_mut().insert(header::LOCATION, location);
        if let Some(cookie) = self.set_cookie {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        response
    }
}
