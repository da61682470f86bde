#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;

pub const PASSWORD: &str = "correct-horse-battery";
/// A tiny valid base64 image payload.
pub const IMAGE: &str = "data:image/png;base64,aGVsbG8=";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub media_root: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let media_root =
            std::env::temp_dir().join(format!("foodgram-media-{}", uuid::Uuid::new_v4()));
        let router = foodgram::build_app(pool.clone(), media_root.clone(), false)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            media_root,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user in the database and return (user_id, email).
    pub async fn create_user(&self, username: &str) -> (String, String) {
        self.insert_user(username, false).await
    }

    pub async fn create_admin(&self, username: &str) -> (String, String) {
        self.insert_user(username, true).await
    }

    async fn insert_user(&self, username: &str, is_admin: bool) -> (String, String) {
        let id = uuid::Uuid::new_v4().to_string();
        let email = format!("{username}@example.com");
        let now = chrono::Utc::now().to_rfc3339();
        let hash = foodgram::auth::hash_password(PASSWORD).unwrap();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(username)
        .bind("Test")
        .bind("User")
        .bind(&hash)
        .bind(is_admin)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test user");

        (id, email)
    }

    /// Log in with the shared test password and return the session cookie string.
    pub async fn login(&self, email: &str) -> String {
        let body = json!({ "email": email, "password": PASSWORD });
        let resp = self
            .send(Method::POST, "/api/auth/login", Some(body), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Create a user and log them in; returns (user_id, cookie).
    pub async fn signed_in(&self, username: &str) -> (String, String) {
        let (id, email) = self.create_user(username).await;
        let cookie = self.login(&email).await;
        (id, cookie)
    }

    pub async fn create_ingredient(&self, name: &str, unit: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO ingredients (id, name, measurement_unit) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(unit)
            .execute(&self.db)
            .await
            .expect("Failed to create test ingredient");
        id
    }

    pub async fn create_tag(&self, name: &str, slug: &str, color: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(color)
            .bind(slug)
            .execute(&self.db)
            .await
            .expect("Failed to create test tag");
        id
    }

    /// Create a recipe through the API and return its id.
    pub async fn create_recipe(
        &self,
        cookie: &str,
        name: &str,
        ingredients: &[(&str, i64)],
        tags: &[&str],
    ) -> String {
        let body = recipe_body(name, ingredients, tags);
        let resp = self.post_json("/api/recipes", body, Some(cookie)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_str().unwrap().to_string()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::GET, uri, None, cookie).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::POST, uri, None, cookie).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send(Method::PATCH, uri, Some(body), cookie).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::DELETE, uri, None, cookie).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

pub fn recipe_body(name: &str, ingredients: &[(&str, i64)], tags: &[&str]) -> Value {
    let ingredients: Vec<Value> = ingredients
        .iter()
        .map(|(id, amount)| json!({ "id": id, "amount": amount }))
        .collect();
    json!({
        "ingredients": ingredients,
        "tags": tags,
        "image": IMAGE,
        "name": name,
        "text": "Mix and bake.",
        "cooking_time": 30,
    })
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

/// Assert an error response's status and `error` kind.
pub async fn assert_error(resp: Response, status: StatusCode, kind: &str) {
    assert_eq!(resp.status(), status);
    let body = body_json(resp).await;
    assert_eq!(body["error"], kind, "unexpected body: {body}");
}
