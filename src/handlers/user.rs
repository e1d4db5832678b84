// src/handlers/user.rs

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, conflict_or_internal},
    models::{
        listing::{ListParams, one_month_ago},
        user::{USER_COLUMNS, UpdateUserRequest, User, UserListResponse},
    },
    policy::{Action, authorize},
    utils::jwt::Claims,
};

/// Liveness check.
pub async fn test() -> impl IntoResponse {
    Json(json!({ "message": "API is working!" }))
}

/// Readiness check: the pool can still reach the database.
pub async fn health(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database health check failed: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(json!({ "status": "ok", "database": "connected" })))
}

pub(crate) async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Sparse profile update.
///
/// Order matters: the policy check runs before the body is even looked at,
/// so a foreign target is a 403 whatever the payload. Validation then covers
/// every supplied field before anything is written.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(user_id) = path?;
    let actor = claims.actor()?;
    authorize(&actor, Action::UpdateUser { target: user_id })?;

    let Json(payload) = payload?;
    let changes = payload.into_changes()?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(username) = changes.username {
        separated.push("username = ");
        separated.push_bind_unseparated(username);
    }

    if let Some(email) = changes.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }

    if let Some(password) = changes.password {
        separated.push("password = ");
        separated.push_bind_unseparated(password);
    }

    if let Some(profile_picture) = changes.profile_picture {
        separated.push("profile_picture = ");
        separated.push_bind_unseparated(profile_picture);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(user_id);
    builder.push(format!(" RETURNING {USER_COLUMNS}"));

    let user = builder
        .build_query_as::<User>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update user: {:?}", e);
            conflict_or_internal(e, "Username or email already exists")
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id, "profile updated");

    Ok(Json(user))
}

/// Deletes a user. Allowed for the user themself or an admin.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(user_id) = path?;
    let actor = claims.actor()?;
    authorize(&actor, Action::DeleteUser { target: user_id })?;

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id, by = actor.id, "user deleted");

    Ok(Json("User has been deleted"))
}

/// Paginated user listing with whole-collection aggregates.
/// Admin only.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    authorize(&actor, Action::ListUsers)?;

    let (offset, limit) = params.window();

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at {}, id {} LIMIT ? OFFSET ?",
        params.direction(),
        params.direction()
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    let last_month_users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= ?")
            .bind(one_month_ago(Utc::now()))
            .fetch_one(&pool)
            .await?;

    Ok(Json(UserListResponse {
        users,
        total_users,
        last_month_users,
    }))
}

/// Public profile lookup (used to render comment authors).
pub async fn get_user(
    State(pool): State<SqlitePool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(user_id) = path?;
    let user = fetch_user(&pool, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
