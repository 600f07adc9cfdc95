//! Fixtures shared by service tests

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use crate::data::{Account, AccountRepository, AccountStatus, Database, EntityId, ResponseCache};
use crate::notification::MockNotificationPublisher;

pub(crate) const PAGE_SIZE: u32 = 10;

pub(crate) async fn create_test_db() -> (Arc<Database>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("service.db");
    let db = Database::connect(&db_path).await.unwrap();
    (Arc::new(db), temp_dir)
}

pub(crate) fn test_cache() -> Arc<ResponseCache> {
    Arc::new(ResponseCache::in_memory(Duration::from_secs(300), 1_000))
}

/// Publisher that accepts any number of events
pub(crate) fn quiet_publisher() -> Arc<MockNotificationPublisher> {
    let mut publisher = MockNotificationPublisher::new();
    publisher.expect_publish().return_const(());
    Arc::new(publisher)
}

/// Insert an active account directly, skipping password hashing
pub(crate) async fn seed_account(db: &Database, username: &str) -> Account {
    let now = Utc::now();
    let account = Account {
        id: EntityId::new().0,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "unused".to_string(),
        name: username.to_string(),
        description: String::new(),
        status: AccountStatus::Active,
        created_at: now,
        updated_at: now,
    };
    db.insert_account(&account).await.unwrap();
    account
}
