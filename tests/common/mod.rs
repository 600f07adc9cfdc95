//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use socialnet::notification::{NotificationEvent, NotificationSink};
use socialnet::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Records every delivered notification for later assertions
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, NotificationEvent)>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<(String, NotificationEvent)> {
        self.delivered.lock().unwrap().clone()
    }

    /// Recipients of every delivery matching `event`
    pub fn recipients_of(&self, event: &NotificationEvent) -> Vec<String> {
        let mut recipients: Vec<String> = self
            .delivered()
            .into_iter()
            .filter(|(_, delivered)| delivered == event)
            .map(|(recipient, _)| recipient)
            .collect();
        recipients.sort();
        recipients
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, recipient: &str, event: &NotificationEvent) {
        self.delivered
            .lock()
            .unwrap()
            .push((recipient.to_string(), event.clone()));
    }
}

/// An account registered through the API together with its session token
pub struct TestAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub token: String,
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_page_size(10).await
    }

    pub async fn with_page_size(page_size: u32) -> Self {
        socialnet::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                request_timeout_seconds: 10,
            },
            database: config::DatabaseConfig {
                path: db_path,
                max_connections: 4,
            },
            cache: config::CacheConfig {
                ttl_seconds: 60,
                max_capacity: 1_000,
            },
            notifications: config::NotificationConfig { enabled: true },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes-long".to_string(),
                session_max_age: 3600,
            },
            pagination: config::PaginationConfig { page_size },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let sink = Arc::new(RecordingSink::default());
        let state = AppState::with_notification_sink(config, sink.clone())
            .await
            .unwrap();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = socialnet::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            sink,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register `username` and log in, returning its id and token
    pub async fn register_and_login(&self, username: &str) -> TestAccount {
        let email = format!("{username}@example.com");
        let password = "correct-horse-battery";

        let response = self
            .client
            .post(self.url("/accounts"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
                "name": username,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "register {username}");
        let account: Value = response.json().await.unwrap();

        let token = self.login(&email, password).await;

        TestAccount {
            id: account["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            email,
            token,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login {email}");
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// `POST /posts` as `account`, returning the created post
    pub async fn create_post(&self, account: &TestAccount, content: &str) -> Value {
        let response = self
            .client
            .post(self.url("/posts"))
            .bearer_auth(&account.token)
            .json(&json!({ "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// `POST /comments/:post_id` as `account`, returning the created comment
    pub async fn create_comment(
        &self,
        account: &TestAccount,
        post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Value {
        let response = self
            .client
            .post(self.url(&format!("/comments/{post_id}")))
            .bearer_auth(&account.token)
            .json(&json!({ "content": content, "parent_comment_id": parent_comment_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    pub async fn follow(&self, follower: &TestAccount, target: &TestAccount) -> reqwest::Response {
        self.client
            .post(self.url("/accounts/follows"))
            .bearer_auth(&follower.token)
            .json(&json!({ "account_id": target.id }))
            .send()
            .await
            .unwrap()
    }

    /// Poll until the consumer has delivered at least `count` notifications
    pub async fn wait_for_deliveries(&self, count: usize) {
        for _ in 0..50 {
            if self.sink.delivered().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
