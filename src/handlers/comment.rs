use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{Sqlite, SqliteExecutor, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    error::{AppError, missing_or_internal},
    models::{
        comment::{
            COMMENT_COLUMNS, Comment, CommentListResponse, CommentRow, CreateCommentRequest,
            EditCommentRequest,
        },
        listing::{ListParams, one_month_ago},
    },
    policy::{Action, authorize},
    utils::jwt::Claims,
};

async fn fetch_row<'e>(
    executor: impl SqliteExecutor<'e>,
    comment_id: i64,
) -> Result<CommentRow, AppError> {
    sqlx::query_as::<_, CommentRow>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"
    ))
    .bind(comment_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}

async fn fetch_likes<'e>(
    executor: impl SqliteExecutor<'e>,
    comment_id: i64,
) -> Result<Vec<i64>, AppError> {
    let likes: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM comment_likes WHERE comment_id = ? ORDER BY user_id",
    )
    .bind(comment_id)
    .fetch_all(executor)
    .await?;
    Ok(likes)
}

/// Attaches liking sets to a batch of rows.
async fn with_likes(pool: &SqlitePool, rows: Vec<CommentRow>) -> Result<Vec<Comment>, AppError> {
    let mut comments = Vec::with_capacity(rows.len());
    for row in rows {
        let likes = fetch_likes(pool, row.id).await?;
        comments.push(Comment::from_row(row, likes));
    }
    Ok(comments)
}

async fn load_in_tx(tx: &mut Transaction<'_, Sqlite>, comment_id: i64) -> Result<Comment, AppError> {
    let row = fetch_row(&mut **tx, comment_id).await?;
    let likes = fetch_likes(&mut **tx, comment_id).await?;
    Ok(Comment::from_row(row, likes))
}

/// Create a new comment.
///
/// The author id travels in the body; it must be the session identity.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let Json(payload) = payload?;
    authorize(&actor, Action::CreateComment { claimed: payload.user_id })?;

    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // A dangling post id fails the foreign key in the insert itself.
    let now = Utc::now();
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        r#"
        INSERT INTO comments (post_id, user_id, content, number_of_likes, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        RETURNING {COMMENT_COLUMNS}
        "#
    ))
    .bind(payload.post_id)
    .bind(actor.id)
    .bind(payload.content.trim())
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        missing_or_internal(e, "Post not found")
    })?;

    Ok((StatusCode::CREATED, Json(Comment::from_row(row, Vec::new()))))
}

/// List all comments for a post, newest first.
pub async fn list_post_comments(
    State(pool): State<SqlitePool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(post_id) = path?;
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(post_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(with_likes(&pool, rows).await?))
}

/// Toggle Like on a comment.
///
/// Present in the liking set: removed and the count drops by one.
/// Absent: added and the count rises by one. Both happen in one transaction.
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(comment_id) = path?;
    let actor = claims.actor()?;
    authorize(&actor, Action::LikeComment)?;

    // The first statement writes, so the transaction takes the write lock up
    // front and concurrent toggles queue on it instead of failing to upgrade.
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
        .bind(comment_id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    fetch_row(&mut *tx, comment_id).await?;

    if removed > 0 {
        // Unlike
        sqlx::query(
            "UPDATE comments SET number_of_likes = MAX(0, number_of_likes - 1) WHERE id = ?",
        )
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;
    } else {
        // Like
        sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES (?, ?)")
            .bind(comment_id)
            .bind(actor.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE comments SET number_of_likes = number_of_likes + 1 WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
    }

    let comment = load_in_tx(&mut tx, comment_id).await?;
    tx.commit().await?;

    tracing::debug!(comment_id, user = actor.id, liked = removed == 0, "like toggled");

    Ok(Json(comment))
}

/// Edit a comment's content.
/// Requires: Login + Author.
pub async fn edit_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EditCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(comment_id) = path?;
    let actor = claims.actor()?;
    let row = fetch_row(&pool, comment_id).await?;
    authorize(&actor, Action::EditComment { author: row.user_id })?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(payload.content.trim())
        .bind(Utc::now())
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;
    let comment = load_in_tx(&mut tx, comment_id).await?;
    tx.commit().await?;

    Ok(Json(comment))
}

/// Delete a comment.
/// Requires: Login + (Author OR Admin).
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(comment_id) = path?;
    let actor = claims.actor()?;
    let row = fetch_row(&pool, comment_id).await?;
    authorize(&actor, Action::DeleteComment { author: row.user_id })?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json("Comment has been deleted"))
}

/// Paginated listing of every comment with whole-collection aggregates.
/// Admin only.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    authorize(&actor, Action::ListComments)?;

    let (offset, limit) = params.window();
    let order = params.direction();

    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments ORDER BY created_at {order}, id {order} LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let total_comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await?;

    let last_month_comments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE created_at >= ?")
            .bind(one_month_ago(Utc::now()))
            .fetch_one(&pool)
            .await?;

    Ok(Json(CommentListResponse {
        comments: with_likes(&pool, rows).await?,
        total_comments,
        last_month_comments,
    }))
}
