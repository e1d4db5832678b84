// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppError, conflict_or_internal},
    models::user::{DEFAULT_PROFILE_PICTURE, SigninRequest, SignupRequest, USER_COLUMNS, User},
    utils::{
        hash::verify_password,
        jwt::{clear_session_cookie, session_cookie, sign_jwt},
    },
    validation::{FieldKind, accept},
};

/// Registers a new user.
///
/// All three fields go through the field validator; the password is stored
/// hashed. Returns 201 Created and the user object (excluding password).
pub async fn signup(
    State(pool): State<SqlitePool>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let (Some(username), Some(email), Some(password)) =
        (payload.username, payload.email, payload.password)
    else {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    };

    let username = accept(FieldKind::Username, &username)?;
    let email = accept(FieldKind::Email, &email)?;
    let hashed_password = accept(FieldKind::Password, &password)?;
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password, profile_picture, is_admin, created_at, updated_at)
        VALUES (?, ?, ?, ?, FALSE, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&username)
    .bind(&email)
    .bind(&hashed_password)
    .bind(DEFAULT_PROFILE_PICTURE)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_or_internal(e, "Username or email already exists"))?;

    tracing::info!(user_id = user.id, "user signed up");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user by email and password.
///
/// On success the session token is set as an HTTP-only cookie and the user
/// record is returned.
pub async fn signin(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    };
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Signin DB error: {:?}", e);
        AppError::from(e)
    })?;

    let invalid = || AppError::AuthError("Invalid credentials".to_string());
    let user = user.ok_or_else(invalid)?;

    if !verify_password(password.trim(), &user.password)? {
        return Err(invalid());
    }

    let token = sign_jwt(
        user.id,
        user.is_admin,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    let cookie = session_cookie(&token, &config)?;

    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

/// Clears the session cookie. Needs no valid session.
pub async fn signout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json("User has been signed out"),
    )
}
