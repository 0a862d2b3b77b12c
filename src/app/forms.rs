//! Field validation for the signup, login and tweet forms.
//!
//! Validation never touches the database; uniqueness of usernames and emails
//! is checked by `AuthService::signup`, which reports into the same
//! [`FormErrors`] shape.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::domain::tweet::MAX_TWEET_CHARS;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_INTEGER: &str = "Enter a whole number.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const PASSWORD_TOO_SHORT: &str = "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const PASSWORD_COMMON: &str = "This password is too common.";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const DUPLICATE_EMAIL: &str = "User with this Email already exists.";
pub const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub const MAX_USERNAME_CHARS: usize = 150;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

/// One lowercase password per line.
const COMMON_PASSWORDS: &str = include_str!("../../data/common-passwords.txt");

/// Field errors keyed by field name, plus errors that belong to no field.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FormErrors {
    #[serde(flatten)]
    fields: BTreeMap<&'static str, Vec<String>>,
    #[serde(rename = "__all__", skip_serializing_if = "Vec::is_empty")]
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn has(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
    pub age: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: Option<i32>,
}

pub fn validate_signup(input: &SignupInput) -> Result<ValidSignup, FormErrors> {
    let mut errors = FormErrors::default();

    let username = input.username.trim();
    let email = input.email.trim();

    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else {
        let chars = username.chars().count();
        if chars > MAX_USERNAME_CHARS {
            errors.add("username", max_length_message(MAX_USERNAME_CHARS, chars));
        }
        if !is_valid_username(username) {
            errors.add("username", INVALID_USERNAME);
        }
    }

    if email.is_empty() {
        errors.add("email", REQUIRED);
    } else if !is_valid_email(email) {
        errors.add("email", INVALID_EMAIL);
    }

    let age = match input.age.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i32>() {
            Ok(age) => Some(age),
            Err(_) => {
                errors.add("age", INVALID_INTEGER);
                None
            }
        },
    };

    // Passwords are never stripped.
    if input.password1.is_empty() {
        errors.add("password1", REQUIRED);
    }
    if input.password2.is_empty() {
        errors.add("password2", REQUIRED);
    } else if !input.password1.is_empty() {
        if input.password1 != input.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else {
            for message in password_problems(&input.password2, username, email) {
                errors.add("password2", message);
            }
        }
    }

    errors.into_result(ValidSignup {
        username: username.to_string(),
        email: email.to_string(),
        password: input.password1.clone(),
        age,
    })
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

pub fn validate_login(input: &LoginInput) -> Result<(String, String), FormErrors> {
    let mut errors = FormErrors::default();
    let username = input.username.trim();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    }
    if input.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors.into_result((username.to_string(), input.password.clone()))
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TweetInput {
    pub content: String,
}

/// Content is stripped, then measured in Unicode scalar values.
pub fn validate_tweet(input: &TweetInput) -> Result<String, FormErrors> {
    let mut errors = FormErrors::default();
    let content = input.content.trim();
    if content.is_empty() {
        errors.add("content", REQUIRED);
    } else {
        let chars = content.chars().count();
        if chars > MAX_TWEET_CHARS {
            errors.add("content", max_length_message(MAX_TWEET_CHARS, chars));
        }
    }
    errors.into_result(content.to_string())
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if local.chars().any(|c| c.is_whitespace() || c.is_control() || c == '"') {
        return false;
    }
    if domain == "localhost" {
        return true;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.chars().count() >= 2 && !tld.chars().all(|c| c.is_ascii_digit())
}

fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if let Some(attribute) = similar_attribute(password, &[("username", username), ("email address", email)]) {
        problems.push(format!("The password is too similar to the {}.", attribute));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        problems.push(PASSWORD_TOO_SHORT.to_string());
    }
    let lowered = password.trim().to_lowercase();
    if is_common_password(&lowered) {
        problems.push(PASSWORD_COMMON.to_string());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push(PASSWORD_NUMERIC.to_string());
    }
    problems
}

fn is_common_password(lowered: &str) -> bool {
    static LIST: OnceLock<HashSet<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        COMMON_PASSWORDS
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    })
    .contains(lowered)
}

fn similar_attribute(password: &str, attributes: &[(&'static str, &str)]) -> Option<&'static str> {
    let password = password.to_lowercase();
    for &(name, value) in attributes {
        if value.is_empty() {
            continue;
        }
        let value = value.to_lowercase();
        let mut parts: Vec<&str> = value
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|part| !part.is_empty())
            .collect();
        parts.push(&value);
        for part in parts {
            if exceeds_length_ratio(&password, part) {
                continue;
            }
            if quick_ratio(&password, part) >= MAX_SIMILARITY {
                return Some(name);
            }
        }
    }
    None
}

/// A password much longer than the attribute can't be meaningfully similar.
fn exceeds_length_ratio(password: &str, value: &str) -> bool {
    let password_len = password.chars().count();
    let value_len = value.chars().count();
    let length_bound = MAX_SIMILARITY / 2.0 * password_len as f64;
    password_len >= 10 * value_len && (value_len as f64) < length_bound
}

/// Upper bound on the matching-blocks ratio: shared characters over total length.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let mut matches = 0;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }
    2.0 * matches as f64 / total as f64
}
