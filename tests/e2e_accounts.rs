//! E2E tests for registration, sessions and account management

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_returns_public_view() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/accounts"))
        .json(&json!({
            "username": "Alice",
            "email": "Alice@Example.com",
            "password": "correct-horse-battery",
            "name": "Alice",
            "description": "hello"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["name"], "Alice");
    assert!(body["id"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let server = TestServer::new().await;
    server.register_and_login("alice").await;

    let duplicate_username = server
        .client
        .post(server.url("/accounts"))
        .json(&json!({
            "username": "ALICE",
            "email": "other@example.com",
            "password": "correct-horse-battery"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate_username.status(), 409);

    let duplicate_email = server
        .client
        .post(server.url("/accounts"))
        .json(&json!({
            "username": "other",
            "email": "alice@example.com",
            "password": "correct-horse-battery"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate_email.status(), 409);

    let short_password = server
        .client
        .post(server.url("/accounts"))
        .json(&json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "short"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(short_password.status(), 400);
}

#[tokio::test]
async fn test_login_failures() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;

    let wrong_password = server
        .client
        .post(server.url("/auth"))
        .json(&json!({ "email": alice.email, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);

    let unknown_email = server
        .client
        .post(server.url("/accounts/auth"))
        .json(&json!({ "email": "nobody@example.com", "password": "whatever-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_email.status(), 404);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;

    let login = server
        .client
        .post(server.url("/auth"))
        .json(&json!({ "email": alice.email, "password": "correct-horse-battery" }))
        .send()
        .await
        .unwrap();
    let set_cookie = login
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header")
        .to_string();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let response = server
        .client
        .get(server.url("/accounts"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], alice.id);
}

#[tokio::test]
async fn test_get_other_account_and_update_own() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;
    let bob = server.register_and_login("bob").await;

    let response = server
        .client
        .get(server.url(&format!("/accounts?id={}", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "bob");

    let response = server
        .client
        .put(server.url("/accounts"))
        .bearer_auth(&alice.token)
        .json(&json!({ "name": "Alice Liddell", "description": "down the hole" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Alice Liddell");
    assert_eq!(body["description"], "down the hole");
    assert_eq!(body["username"], "alice");

    let taken = server
        .client
        .put(server.url("/accounts"))
        .bearer_auth(&alice.token)
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status(), 409);
}

#[tokio::test]
async fn test_deleted_account_frees_its_username() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;

    let response = server
        .client
        .delete(server.url("/accounts"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The old token still verifies but its account is gone
    let response = server
        .client
        .get(server.url("/accounts"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = server
        .client
        .post(server.url("/auth"))
        .json(&json!({ "email": alice.email, "password": "correct-horse-battery" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let again = server.register_and_login("alice").await;
    assert_ne!(again.id, alice.id);
}
