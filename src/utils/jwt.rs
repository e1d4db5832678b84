// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, policy::Actor, state::AppState};

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "access_token";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub is_admin: bool,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The verified identity behind this session.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        Ok(Actor {
            id,
            is_admin: self.is_admin,
        })
    }
}

/// Signs a new session token for the user.
pub fn sign_jwt(
    id: i64,
    is_admin: bool,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        is_admin,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Finds a cookie value by name in the `Cookie` header.
fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Session token from the cookie, falling back to `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// `Set-Cookie` value that stores a fresh session token.
pub fn session_cookie(token: &str, config: &Config) -> Result<HeaderValue, AppError> {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        SESSION_COOKIE, token, config.jwt_expiration, secure
    ))
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("access_token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Resolves the request's session to verified claims.
///
/// The token must be well signed and its subject must still exist; a
/// session that outlives its account is treated like no session at all.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    let token =
        extract_token(headers).ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;
    let claims = verify_jwt(&token, &state.config.jwt_secret)?;
    let actor = claims.actor()?;

    let known: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(actor.id)
        .fetch_optional(&state.pool)
        .await?;
    if known.is_none() {
        return Err(AppError::AuthError("Unauthorized".to_string()));
    }

    Ok(claims)
}

/// Axum Middleware: Authentication.
///
/// Verifies the session token and injects `Claims` into the request
/// extensions. Anything missing, badly signed or belonging to a deleted
/// account is rejected with 401 before the handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected session: {:?}", e);
            e.into_response()
        }
    }
}
