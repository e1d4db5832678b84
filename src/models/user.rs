// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::AppError,
    validation::{FieldKind, accept, supplied},
};

pub const DEFAULT_PROFILE_PICTURE: &str =
    "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_1280.png";

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique, lowercase, alphanumeric.
    pub username: String,

    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization so no response path can leak it.
    #[serde(skip)]
    pub password: String,

    pub profile_picture: String,

    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str =
    "id, username, email, password, profile_picture, is_admin, created_at, updated_at";

/// Admin listing payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total_users: i64,
    pub last_month_users: i64,
}

/// DTO for registration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// DTO for sign-in.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// DTO for a profile update. Every field is optional; unknown fields are
/// rejected instead of being silently dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_picture: Option<String>,
}

/// Validated, sparse set of column changes. The password is already hashed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_picture: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.profile_picture.is_none()
    }
}

impl UpdateUserRequest {
    /// Validates every supplied field. The first failure aborts the whole
    /// update; an update with nothing left in it is itself an error.
    pub fn into_changes(self) -> Result<UserChanges, AppError> {
        let field = |kind, value: Option<String>| -> Result<Option<String>, AppError> {
            supplied(value).map(|v| accept(kind, &v)).transpose()
        };

        let changes = UserChanges {
            username: field(FieldKind::Username, self.username)?,
            email: field(FieldKind::Email, self.email)?,
            password: field(FieldKind::Password, self.password)?,
            profile_picture: field(FieldKind::ProfilePicture, self.profile_picture)?,
        };

        if changes.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".to_string()));
        }

        Ok(changes)
    }
}
