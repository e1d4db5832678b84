// src/validation.rs

//! Shape and format checks for user-editable account fields.
//!
//! Each check trims its input and either returns the normalized value or a
//! reason string suitable for a 400 response. Passwords leave this module
//! only in hashed form.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::{error::AppError, utils::hash::hash_password};

pub const USERNAME_MIN: usize = 7;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("static regex"));

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Username,
    Email,
    Password,
    ProfilePicture,
}

/// Checks one field and returns its normalized (trimmed) value.
///
/// Passwords come back as trimmed plaintext; use [`accept`] to get the hash.
pub fn check(kind: FieldKind, raw: &str) -> Result<String, &'static str> {
    let value = raw.trim();
    let verdict = match kind {
        FieldKind::Username => check_username(value),
        FieldKind::Email => check_email(value),
        FieldKind::Password => check_password(value),
        FieldKind::ProfilePicture => check_url(value),
    };
    verdict.map(|()| value.to_string())
}

/// Runs [`check`] and turns the result into what gets persisted.
pub fn accept(kind: FieldKind, raw: &str) -> Result<String, AppError> {
    let value = check(kind, raw).map_err(|reason| AppError::BadRequest(reason.to_string()))?;
    match kind {
        FieldKind::Password => hash_password(&value),
        _ => Ok(value),
    }
}

/// Sparse-update helper: `None` and blank strings both mean "leave it alone".
pub fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_username(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Username is required");
    }
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err("Username must be between 7 and 20 characters");
    }
    if value.chars().any(char::is_whitespace) {
        return Err("Username cannot contain spaces");
    }
    if value != value.to_lowercase() {
        return Err("Username must be lowercase");
    }
    if !USERNAME_CHARS.is_match(value) {
        return Err("Username can only contain letters and numbers");
    }
    Ok(())
}

fn check_email(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Email is required");
    }
    if !EMAIL_SHAPE.is_match(value) {
        return Err("Invalid email address");
    }
    Ok(())
}

fn check_password(value: &str) -> Result<(), &'static str> {
    if value.chars().count() < PASSWORD_MIN {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

fn check_url(value: &str) -> Result<(), &'static str> {
    if Url::parse(value).is_err() {
        return Err("Profile picture must be a valid URL");
    }
    Ok(())
}
