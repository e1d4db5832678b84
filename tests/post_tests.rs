// tests/post_tests.rs

use blog_api::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

/// Spawns the app on a random port over a fresh in-memory database.
/// Returns the base URL and a handle on the same database for seeding.
async fn spawn_app() -> (String, SqlitePool) {
    // A single, never-recycled connection keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config::for_testing("test_secret_for_integration_tests");
    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn signup(client: &reqwest::Client, address: &str, username: &str, email: &str) -> i64 {
    let response = client
        .post(format!("{}/api/auth/signup", address))
        .json(&json!({ "username": username, "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Signup failed");
    assert_eq!(response.status().as_u16(), 201);
    response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

/// Signs in and returns the `access_token=...` cookie pair.
async fn signin(client: &reqwest::Client, address: &str, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/signin", address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Signin failed");
    assert_eq!(response.status().as_u16(), 200);

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("session cookie missing")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn promote(pool: &SqlitePool, id: i64) {
    sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

/// Signs up a regular user and returns (id, cookie).
async fn member(client: &reqwest::Client, address: &str, username: &str) -> (i64, String) {
    let email = format!("{}@blog.io", username);
    let id = signup(client, address, username, &email).await;
    let cookie = signin(client, address, &email, "password123").await;
    (id, cookie)
}

/// Signs up an admin and returns (id, cookie). The cookie is issued after promotion.
async fn admin(client: &reqwest::Client, address: &str, pool: &SqlitePool) -> (i64, String) {
    let id = signup(client, address, "theadmin", "theadmin@blog.io").await;
    promote(pool, id).await;
    let cookie = signin(client, address, "theadmin@blog.io", "password123").await;
    (id, cookie)
}

async fn create_post(client: &reqwest::Client, address: &str, cookie: &str, title: &str) -> Value {
    let response = client
        .post(format!("{}/api/post/create", address))
        .header("Cookie", cookie)
        .json(&json!({
            "title": title,
            "content": "<p>Hello</p><script>alert('x')</script>",
            "category": "reactjs"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn only_admins_create_posts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, alice_cookie) = member(&client, &address, "alicesmith").await;
    let (admin_id, admin_cookie) = admin(&client, &address, &pool).await;

    let denied = client
        .post(format!("{}/api/post/create", address))
        .header("Cookie", &alice_cookie)
        .json(&json!({ "title": "Nope", "content": "<p>x</p>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);

    let post = create_post(&client, &address, &admin_cookie, "Hello World: Part 1!").await;
    assert_eq!(post["slug"], "hello-world-part-1");
    assert_eq!(post["userId"], admin_id);
    assert_eq!(post["category"], "reactjs");
    assert!(!post["content"].as_str().unwrap().contains("script"));

    let duplicate = client
        .post(format!("{}/api/post/create", address))
        .header("Cookie", &admin_cookie)
        .json(&json!({ "title": "Hello World: Part 1!", "content": "<p>again</p>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);
}

#[tokio::test]
async fn getposts_filters_and_keeps_whole_collection_counts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    for title in ["Rust ownership", "Async in practice", "Rust lifetimes"] {
        create_post(&client, &address, &admin_cookie, title).await;
    }

    let by_slug: Value = client
        .get(format!("{}/api/post/getposts?slug=async-in-practice", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_slug["posts"].as_array().unwrap().len(), 1);
    assert_eq!(by_slug["posts"][0]["title"], "Async in practice");
    assert_eq!(by_slug["totalPosts"], 3);
    assert_eq!(by_slug["lastMonthPosts"], 3);

    let search: Value = client
        .get(format!("{}/api/post/getposts?searchTerm=RUST", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(search["posts"].as_array().unwrap().len(), 2);

    let page: Value = client
        .get(format!("{}/api/post/getposts?limit=1&order=asc", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["posts"].as_array().unwrap().len(), 1);
    assert_eq!(page["posts"][0]["title"], "Rust ownership");
    assert_eq!(page["totalPosts"], 3);
}

#[tokio::test]
async fn strangers_cannot_delete_posts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, bob_cookie) = member(&client, &address, "bobjones").await;
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    let post = create_post(&client, &address, &admin_cookie, "Keep me around").await;
    let post_id = post["id"].as_i64().unwrap();

    let denied = client
        .delete(format!("{}/api/post/deletepost/{}", address, post_id))
        .header("Cookie", &bob_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);

    let still_there: Value = client
        .get(format!("{}/api/post/getposts?postId={}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(still_there["posts"].as_array().unwrap().len(), 1);

    let deleted = client
        .delete(format!("{}/api/post/deletepost/{}", address, post_id))
        .header("Cookie", &admin_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 200);

    let gone = client
        .delete(format!("{}/api/post/deletepost/{}", address, post_id))
        .header("Cookie", &admin_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn owners_update_posts_sparsely() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, bob_cookie) = member(&client, &address, "bobjones").await;
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    let post = create_post(&client, &address, &admin_cookie, "First draft").await;
    let post_id = post["id"].as_i64().unwrap();

    let denied = client
        .put(format!("{}/api/post/updatepost/{}", address, post_id))
        .header("Cookie", &bob_cookie)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);

    let empty = client
        .put(format!("{}/api/post/updatepost/{}", address, post_id))
        .header("Cookie", &admin_cookie)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 400);

    let updated: Value = client
        .put(format!("{}/api/post/updatepost/{}", address, post_id))
        .header("Cookie", &admin_cookie)
        .json(&json!({ "title": "Final version" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["title"], "Final version");
    assert_eq!(updated["slug"], "final-version");
    assert_eq!(updated["category"], "reactjs");
    assert_eq!(updated["content"], post["content"]);
}

#[tokio::test]
async fn search_term_wildcards_match_literally() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    for title in ["Uptime 100% guaranteed", "Uptime 1000 days", "snake_case names", "snakescase"] {
        create_post(&client, &address, &admin_cookie, title).await;
    }

    for (term, expected) in [("100%", "Uptime 100% guaranteed"), ("snake_case", "snake_case names")] {
        let found: Value = client
            .get(format!("{}/api/post/getposts", address))
            .query(&[("searchTerm", term)])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let posts = found["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1, "{}", term);
        assert_eq!(posts[0]["title"], expected);
    }
}

#[tokio::test]
async fn content_that_sanitizes_to_nothing_is_rejected() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    let scripted = client
        .post(format!("{}/api/post/create", address))
        .header("Cookie", &admin_cookie)
        .json(&json!({ "title": "Only a script", "content": "<script>alert('x')</script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(scripted.status().as_u16(), 400);

    let post = create_post(&client, &address, &admin_cookie, "Real content").await;
    let post_id = post["id"].as_i64().unwrap();

    let emptied = client
        .put(format!("{}/api/post/updatepost/{}", address, post_id))
        .header("Cookie", &admin_cookie)
        .json(&json!({ "content": "<script>steal()</script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(emptied.status().as_u16(), 400);

    let stored: String = sqlx::query_scalar("SELECT content FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, post["content"].as_str().unwrap());
}

#[tokio::test]
async fn non_numeric_post_id_is_a_json_bad_request() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_cookie) = admin(&client, &address, &pool).await;

    let response = client
        .delete(format!("{}/api/post/deletepost/not-a-number", address))
        .header("Cookie", &admin_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);
}
