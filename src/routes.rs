// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, comment, post as posts, user},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes and session-protected routes are split per resource; the
///   protected half sits behind `auth_middleware`, so a missing or forged
///   session is a 401 before any handler runs.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_session = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin));

    let user_routes = Router::new()
        .route(
            "/update/{user_id}",
            put(user::update_user).post(user::update_user),
        )
        .route("/delete/{user_id}", delete(user::delete_user))
        .route("/getusers", get(user::list_users))
        .layer(require_session.clone())
        .route("/test", get(user::test))
        .route("/signout", post(auth::signout))
        .route("/{user_id}", get(user::get_user));

    let post_routes = Router::new()
        .route("/create", post(posts::create_post))
        .route("/updatepost/{post_id}", put(posts::update_post))
        .route("/deletepost/{post_id}", delete(posts::delete_post))
        .layer(require_session.clone())
        .route("/getposts", get(posts::list_posts));

    let comment_routes = Router::new()
        .route("/create", post(comment::create_comment))
        .route("/likeComment/{comment_id}", put(comment::toggle_like))
        .route("/editComment/{comment_id}", put(comment::edit_comment))
        .route("/deleteComment/{comment_id}", delete(comment::delete_comment))
        .route("/getcomments", get(comment::list_comments))
        .layer(require_session.clone())
        .route(
            "/getPostComments/{post_id}",
            get(comment::list_post_comments),
        );

    Router::new()
        .route("/api/health", get(user::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/post", post_routes)
        .nest("/api/comment", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
