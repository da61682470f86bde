mod common;

use axum::http::StatusCode;
use common::{assert_error, body_json, TestApp};
use serde_json::json;

fn registration(email: &str, username: &str) -> serde_json::Value {
    json!({
        "email": email,
        "username": username,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "password": "difference-engine",
    })
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/api/users", registration("Ada@Example.com", "ada"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["username"], "ada");
    assert!(body.get("password").is_none());

    let login = json!({ "email": "ada@example.com", "password": "difference-engine" });
    let resp = app.post_json("/api/auth/login", login, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/api/users", registration("a@example.com", "ada"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .post_json("/api/users", registration("b@example.com", "ada"), None)
        .await;
    assert_error(resp, StatusCode::BAD_REQUEST, "Conflict").await;
}

#[tokio::test]
async fn reserved_and_malformed_usernames_are_rejected() {
    let app = TestApp::new().await;

    for username in ["me", "ME", "bad name!", ""] {
        let resp = app
            .post_json("/api/users", registration("x@example.com", username), None)
            .await;
        assert_error(resp, StatusCode::BAD_REQUEST, "InvalidField").await;
    }
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/api/users", registration("not-an-email", "ada"), None)
        .await;
    assert_error(resp, StatusCode::BAD_REQUEST, "InvalidField").await;
}

#[tokio::test]
async fn user_list_is_paginated() {
    let app = TestApp::new().await;
    for name in ["u1", "u2", "u3"] {
        app.create_user(name).await;
    }

    let resp = app.get("/api/users?limit=2", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["next"], "/api/users?limit=2&page=2");
    assert!(body["previous"].is_null());
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let resp = app.get("/api/users/missing", None).await;
    assert_error(resp, StatusCode::NOT_FOUND, "UserNotFound").await;
}

#[tokio::test]
async fn set_password_checks_current_password() {
    let app = TestApp::new().await;
    let (_, email) = app.create_user("alice").await;
    let cookie = app.login(&email).await;

    let body = json!({ "current_password": "wrong", "new_password": "fresh-pass" });
    let resp = app.post_json("/api/users/set_password", body, Some(&cookie)).await;
    assert_error(resp, StatusCode::BAD_REQUEST, "InvalidCredentials").await;

    let body = json!({ "current_password": common::PASSWORD, "new_password": "fresh-pass" });
    let resp = app.post_json("/api/users/set_password", body, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let login = json!({ "email": email, "password": "fresh-pass" });
    let resp = app.post_json("/api/auth/login", login, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn subscribe_and_unsubscribe() {
    let app = TestApp::new().await;
    let (author_id, author_cookie) = app.signed_in("chef").await;
    let (_, cookie) = app.signed_in("fan").await;

    let flour = app.create_ingredient("Flour", "g").await;
    let tag = app.create_tag("Lunch", "lunch", "#49B64E").await;
    for name in ["Bread", "Buns", "Pie"] {
        app.create_recipe(&author_cookie, name, &[(&flour, 100)], &[&tag])
            .await;
    }

    let uri = format!("/api/users/{author_id}/subscribe?recipes_limit=2");
    let resp = app.post(&uri, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["id"], author_id.as_str());
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 3);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);

    let resp = app.post(&uri, Some(&cookie)).await;
    assert_error(resp, StatusCode::BAD_REQUEST, "AlreadyFollowing").await;

    let resp = app.get("/api/users/subscriptions", Some(&cookie)).await;
    let body = body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "chef");
    assert_eq!(body["results"][0]["recipes"].as_array().unwrap().len(), 3);

    let resp = app
        .get(&format!("/api/users/{author_id}"), Some(&cookie))
        .await;
    assert_eq!(body_json(resp).await["is_subscribed"], true);

    let uri = format!("/api/users/{author_id}/subscribe");
    let resp = app.delete(&uri, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.delete(&uri, Some(&cookie)).await;
    assert_error(resp, StatusCode::BAD_REQUEST, "NotFollowing").await;
}

#[tokio::test]
async fn cannot_follow_yourself() {
    let app = TestApp::new().await;
    let (user_id, cookie) = app.signed_in("alice").await;

    let resp = app
        .post(&format!("/api/users/{user_id}/subscribe"), Some(&cookie))
        .await;
    assert_error(resp, StatusCode::BAD_REQUEST, "SelfFollow").await;
}

#[tokio::test]
async fn subscribe_to_unknown_user_is_not_found() {
    let app = TestApp::new().await;
    let (_, cookie) = app.signed_in("alice").await;

    let resp = app.post("/api/users/missing/subscribe", Some(&cookie)).await;
    assert_error(resp, StatusCode::NOT_FOUND, "UserNotFound").await;
}
