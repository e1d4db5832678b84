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
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, conflict_or_internal},
    models::{
        listing::{direction, one_month_ago, window},
        post::{
            CreatePostRequest, DEFAULT_CATEGORY, DEFAULT_POST_IMAGE, POST_COLUMNS, Post,
            PostListParams, PostListResponse, UpdatePostRequest, like_pattern,
        },
    },
    policy::{Action, authorize},
    utils::{html::clean_html, jwt::Claims, slug::slugify},
};

const DUPLICATE_POST: &str = "A post with this title already exists";

/// Sanitizes post HTML; markup that cleans down to nothing is rejected.
fn sanitized_content(raw: &str) -> Result<String, AppError> {
    let content = clean_html(raw);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Content cannot be empty after sanitizing".to_string(),
        ));
    }
    Ok(content)
}

async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Create a new post.
/// Requires: Login + Admin.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    authorize(&actor, Action::CreatePost)?;

    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let title = payload.title.trim().to_string();
    let slug = slugify(&title);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Title must contain letters or numbers".to_string(),
        ));
    }
    let content = sanitized_content(&payload.content)?;
    let now = Utc::now();

    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (user_id, title, slug, category, content, image, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(actor.id)
    .bind(&title)
    .bind(&slug)
    .bind(payload.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
    .bind(&content)
    .bind(payload.image.as_deref().unwrap_or(DEFAULT_POST_IMAGE))
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        conflict_or_internal(e, DUPLICATE_POST)
    })?;

    tracing::info!(post_id = post.id, slug = %post.slug, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Public, filtered post listing.
///
/// `totalPosts` and `lastMonthPosts` count the whole collection, never just
/// the filtered page.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (offset, limit) = window(params.start_index, params.limit);
    let order = direction(params.order.as_deref());

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1 = 1"));

    if let Some(user_id) = params.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(category) = params.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(slug) = params.slug {
        builder.push(" AND slug = ").push_bind(slug);
    }
    if let Some(post_id) = params.post_id {
        builder.push(" AND id = ").push_bind(post_id);
    }
    if let Some(term) = params.search_term.filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term.trim());
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR content LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    builder.push(format!(" ORDER BY updated_at {order}, id {order} LIMIT "));
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let posts = builder
        .build_query_as::<Post>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::from(e)
        })?;

    let total_posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await?;

    let last_month_posts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE created_at >= ?")
            .bind(one_month_ago(Utc::now()))
            .fetch_one(&pool)
            .await?;

    Ok(Json(PostListResponse {
        posts,
        total_posts,
        last_month_posts,
    }))
}

/// Sparse post update.
/// Requires: Login + (Owner OR Admin).
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(post_id) = path?;
    let actor = claims.actor()?;
    let post = fetch_post(&pool, post_id).await?;
    authorize(&actor, Action::UpdatePost { owner: post.user_id })?;

    let Json(payload) = payload?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".to_string()));
    }
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE posts SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Title must contain letters or numbers".to_string(),
            ));
        }
        separated.push("title = ");
        separated.push_bind_unseparated(title);
        separated.push("slug = ");
        separated.push_bind_unseparated(slug);
    }

    if let Some(content) = payload.content {
        separated.push("content = ");
        separated.push_bind_unseparated(sanitized_content(&content)?);
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    if let Some(image) = payload.image {
        separated.push("image = ");
        separated.push_bind_unseparated(image);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(post_id);
    builder.push(format!(" RETURNING {POST_COLUMNS}"));

    let updated = builder
        .build_query_as::<Post>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update post: {:?}", e);
            conflict_or_internal(e, DUPLICATE_POST)
        })?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a post.
/// Requires: Login + (Owner OR Admin).
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(post_id) = path?;
    let actor = claims.actor()?;

    // 1. Fetch Post to check ownership
    let post = fetch_post(&pool, post_id).await?;

    // 2. Check Permission
    authorize(&actor, Action::DeletePost { owner: post.user_id })?;

    // 3. Delete (comments cascade)
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(post_id, by = actor.id, "post deleted");

    Ok(Json("The post has been deleted"))
}
