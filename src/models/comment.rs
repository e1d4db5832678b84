use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub number_of_likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, content, number_of_likes, created_at, updated_at";

/// A comment as returned to clients, with its liking set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    /// Ids of the users who like this comment.
    pub likes: Vec<i64>,
    pub number_of_likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_row(row: CommentRow, likes: Vec<i64>) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            content: row.content,
            likes,
            number_of_likes: row.number_of_likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[validate(custom(function = validate_comment_content))]
    pub content: String,

    pub post_id: i64,

    /// Must match the session identity.
    pub user_id: i64,
}

/// DTO for editing a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EditCommentRequest {
    #[validate(custom(function = validate_comment_content))]
    pub content: String,
}

pub const COMMENT_MAX: usize = 200;

/// Content is stored trimmed, so the bounds apply to the trimmed text.
fn validate_comment_content(content: &str) -> Result<(), ValidationError> {
    let len = content.trim().chars().count();
    if len == 0 || len > COMMENT_MAX {
        return Err(ValidationError::new("length").with_message(Cow::Borrowed(
            "Comment must be between 1 and 200 characters",
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
    pub total_comments: i64,
    pub last_month_comments: i64,
}
