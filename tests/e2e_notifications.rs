//! E2E tests for notification fan-out

mod common;

use common::TestServer;
use serde_json::{Value, json};
use socialnet::notification::NotificationEvent;

#[tokio::test]
async fn test_follow_notifies_the_followed_account() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;
    let bob = server.register_and_login("bob").await;

    server.follow(&alice, &bob).await;
    server.wait_for_deliveries(1).await;

    assert_eq!(
        server
            .sink
            .recipients_of(&NotificationEvent::follow_account(&bob.id)),
        vec![bob.email.clone()]
    );
}

#[tokio::test]
async fn test_new_post_notifies_active_followers() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;
    let bob = server.register_and_login("bob").await;
    let carol = server.register_and_login("carol").await;
    let dave = server.register_and_login("dave").await;

    server.follow(&bob, &alice).await;
    server.follow(&carol, &alice).await;
    server.follow(&dave, &alice).await;

    // Dave stops following before the post goes out
    server
        .client
        .delete(server.url("/accounts/follows"))
        .bearer_auth(&dave.token)
        .json(&json!({ "account_id": alice.id }))
        .send()
        .await
        .unwrap();

    let post = server.create_post(&alice, "news").await;
    let post_id = post["id"].as_str().unwrap().to_string();

    // Three follow events delivered to alice plus two post deliveries
    server.wait_for_deliveries(5).await;

    assert_eq!(
        server.sink.recipients_of(&NotificationEvent::post(&post_id)),
        vec![bob.email.clone(), carol.email.clone()]
    );
}

#[tokio::test]
async fn test_reply_notifies_post_author_and_parent_author_once_each() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;
    let bob = server.register_and_login("bob").await;
    let carol = server.register_and_login("carol").await;

    let post = server.create_post(&alice, "a post").await;
    let post_id = post["id"].as_str().unwrap().to_string();
    let top = server
        .create_comment(&bob, &post_id, None, "top level")
        .await;
    let top_id = top["id"].as_str().unwrap().to_string();
    let reply = server
        .create_comment(&carol, &post_id, Some(top_id.as_str()), "reply")
        .await;
    let reply_id = reply["id"].as_str().unwrap().to_string();

    // The top-level comment only reaches the post author
    server.wait_for_deliveries(3).await;

    assert_eq!(
        server
            .sink
            .recipients_of(&NotificationEvent::comment(&top_id)),
        vec![alice.email.clone()]
    );
    assert_eq!(
        server
            .sink
            .recipients_of(&NotificationEvent::comment(&reply_id)),
        vec![alice.email.clone(), bob.email.clone()]
    );
}

#[tokio::test]
async fn test_reaction_notifies_target_author() {
    let server = TestServer::new().await;
    let alice = server.register_and_login("alice").await;
    let bob = server.register_and_login("bob").await;

    let post = server.create_post(&alice, "a post").await;
    let like: Value = server
        .client
        .post(server.url("/interaction"))
        .bearer_auth(&bob.token)
        .json(&json!({ "post_id": post["id"], "type": "like" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let interaction_id = like["id"].as_str().unwrap().to_string();

    server.wait_for_deliveries(1).await;

    assert_eq!(
        server
            .sink
            .recipients_of(&NotificationEvent::interaction(&interaction_id)),
        vec![alice.email.clone()]
    );
}
