//! Post service
//!
//! Creation, ownership-gated edits, soft removal and cached listings.

use std::sync::Arc;

use chrono::Utc;

use super::content::{
    cache_aside, ensure_owner, list_fingerprint, normalize_content, require_active_account, window,
};
use crate::data::{
    AccountRepository, ContentStatus, Database, EntityId, Page, Post, PostRepository, PostView,
    ResponseCache,
};
use crate::error::{AppError, Result};
use crate::notification::{NotificationEvent, NotificationPublisher};

pub struct PostService {
    accounts: Arc<dyn AccountRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<ResponseCache>,
    publisher: Arc<dyn NotificationPublisher>,
    page_size: u32,
}

impl PostService {
    pub fn new(
        db: Arc<Database>,
        cache: Arc<ResponseCache>,
        publisher: Arc<dyn NotificationPublisher>,
        page_size: u32,
    ) -> Self {
        Self {
            accounts: db.clone(),
            posts: db,
            cache,
            publisher,
            page_size,
        }
    }

    async fn require_active_post(&self, post_id: &str) -> Result<Post> {
        self.posts
            .find_active_post(post_id)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    /// Publish a new post
    pub async fn create(&self, author_id: &str, content: &str) -> Result<PostView> {
        let content = normalize_content(content)?;
        require_active_account(self.accounts.as_ref(), author_id).await?;

        let now = Utc::now();
        let post = Post {
            id: EntityId::new().0,
            account_id: author_id.to_string(),
            content,
            status: ContentStatus::Active,
            created_at: now,
            updated_at: now,
            likes: 0,
            dislikes: 0,
        };
        self.posts.insert_post(&post).await?;

        tracing::info!(post_id = %post.id, account_id = author_id, "post created");
        self.publisher.publish(NotificationEvent::post(&post.id));

        Ok(PostView::from(post))
    }

    pub async fn get(&self, post_id: &str) -> Result<PostView> {
        self.require_active_post(post_id).await.map(PostView::from)
    }

    /// Replace the content of the caller's own post
    pub async fn update(&self, post_id: &str, caller_id: &str, content: &str) -> Result<PostView> {
        let content = normalize_content(content)?;
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let post = self.require_active_post(post_id).await?;
        ensure_owner(&post.account_id, caller_id)?;

        if !self
            .posts
            .update_post_content(post_id, &content, Utc::now())
            .await?
        {
            return Err(AppError::NotFound("Post"));
        }

        tracing::info!(post_id, "post updated");
        self.get(post_id).await
    }

    /// Soft-remove the caller's own post, returning its last view
    pub async fn remove(&self, post_id: &str, caller_id: &str) -> Result<PostView> {
        require_active_account(self.accounts.as_ref(), caller_id).await?;
        let post = self.require_active_post(post_id).await?;
        ensure_owner(&post.account_id, caller_id)?;

        if !self.posts.remove_post(post_id, Utc::now()).await? {
            return Err(AppError::NotFound("Post"));
        }

        tracing::info!(post_id, "post removed");
        Ok(PostView::from(post))
    }

    /// Posts by `owner_id`, newest first
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        caller_id: &str,
        page: Page,
    ) -> Result<Vec<PostView>> {
        let fingerprint = list_fingerprint(
            "/accounts/posts",
            &[("id", owner_id.to_string())],
            page,
            caller_id,
        );

        cache_aside(&self.cache, fingerprint, || async {
            require_active_account(self.accounts.as_ref(), caller_id).await?;
            require_active_account(self.accounts.as_ref(), owner_id).await?;

            let (limit, offset) = window(page, self.page_size);
            let posts = self
                .posts
                .list_posts_by_account(owner_id, limit, offset)
                .await?;
            Ok(posts.into_iter().map(PostView::from).collect())
        })
        .await
    }

    /// Posts by accounts the caller follows, newest first
    pub async fn list_by_following_graph(&self, caller_id: &str, page: Page) -> Result<Vec<PostView>> {
        let fingerprint = list_fingerprint("/accounts/follows/posts", &[], page, caller_id);

        cache_aside(&self.cache, fingerprint, || async {
            require_active_account(self.accounts.as_ref(), caller_id).await?;

            let (limit, offset) = window(page, self.page_size);
            let posts = self.posts.list_feed(caller_id, limit, offset).await?;
            Ok(posts.into_iter().map(PostView::from).collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::data::FollowRepository;
    use crate::notification::{MockNotificationPublisher, NotificationType};
    use crate::service::AccountGraphService;
    use crate::service::test_support::{
        PAGE_SIZE, create_test_db, quiet_publisher, seed_account, test_cache,
    };

    fn service(db: Arc<Database>) -> PostService {
        PostService::new(db, test_cache(), quiet_publisher(), PAGE_SIZE)
    }

    #[tokio::test]
    async fn create_publishes_post_event() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;

        let mut publisher = MockNotificationPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.kind == NotificationType::Post)
            .times(1)
            .return_const(());
        let service = PostService::new(db, test_cache(), Arc::new(publisher), PAGE_SIZE);

        let post = service.create(&alice.id, "  hello world ").await.unwrap();
        assert_eq!(post.content, "hello world");
        assert_eq!((post.likes, post.dislikes), (0, 0));
    }

    #[tokio::test]
    async fn invalid_create_publishes_nothing() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;

        let mut publisher = MockNotificationPublisher::new();
        publisher.expect_publish().never();
        let service = PostService::new(db, test_cache(), Arc::new(publisher), PAGE_SIZE);

        assert!(matches!(
            service.create(&alice.id, "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create("missing", "hello").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_owner_can_update_or_remove() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let bob = seed_account(&db, "bob").await;
        let service = service(db);

        let post = service.create(&alice.id, "original").await.unwrap();

        assert!(matches!(
            service.update(&post.id, &bob.id, "hijack").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.remove(&post.id, &bob.id).await,
            Err(AppError::Unauthorized)
        ));

        let updated = service.update(&post.id, &alice.id, "edited").await.unwrap();
        assert_eq!(updated.content, "edited");
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn removed_post_is_frozen() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let service = service(db);

        let post = service.create(&alice.id, "short lived").await.unwrap();
        let snapshot = service.remove(&post.id, &alice.id).await.unwrap();
        assert_eq!(snapshot.content, "short lived");

        assert!(matches!(
            service.update(&post.id, &alice.id, "again").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.remove(&post.id, &alice.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.get(&post.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn owner_pages_are_disjoint_and_newest_first() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let service = service(db);

        let mut created = Vec::new();
        for i in 0..15 {
            created.push(service.create(&alice.id, &format!("post {i}")).await.unwrap());
        }
        // One removed post must not appear anywhere
        service.remove(&created[7].id, &alice.id).await.unwrap();

        let first = service
            .list_by_owner(&alice.id, &alice.id, Page::FIRST)
            .await
            .unwrap();
        let second = service
            .list_by_owner(&alice.id, &alice.id, Page::new(2).unwrap())
            .await
            .unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 4);

        let all: Vec<_> = first.iter().chain(second.iter()).collect();
        for pair in all.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(all[0].content, "post 14");

        let ids: HashSet<_> = all.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 14);
        assert!(!ids.contains(&created[7].id));
    }

    #[tokio::test]
    async fn listing_requires_active_accounts() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let service = service(db);

        assert!(matches!(
            service.list_by_owner("missing", &alice.id, Page::FIRST).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.list_by_owner(&alice.id, "missing", Page::FIRST).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cached_listing_is_served_until_ttl() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let cache = Arc::new(ResponseCache::in_memory(Duration::from_millis(200), 100));
        let service = PostService::new(db, cache, quiet_publisher(), PAGE_SIZE);

        service.create(&alice.id, "first").await.unwrap();
        let before = service
            .list_by_owner(&alice.id, &alice.id, Page::FIRST)
            .await
            .unwrap();
        assert_eq!(before.len(), 1);

        // Writes do not invalidate; the same fingerprint stays stale
        service.create(&alice.id, "second").await.unwrap();
        let stale = service
            .list_by_owner(&alice.id, &alice.id, Page::FIRST)
            .await
            .unwrap();
        assert_eq!(stale, before);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let fresh = service
            .list_by_owner(&alice.id, &alice.id, Page::FIRST)
            .await
            .unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[tokio::test]
    async fn feed_follows_the_graph() {
        let (db, _temp_dir) = create_test_db().await;
        let u1 = seed_account(&db, "u1_author").await;
        let u2 = seed_account(&db, "u2_reader").await;
        let graph = AccountGraphService::new(
            db.clone(),
            quiet_publisher(),
            crate::config::AuthConfig {
                session_secret: "s".repeat(32),
                session_max_age: 3600,
            },
            PAGE_SIZE,
        );
        let service = service(db.clone());

        graph.follow(&u2.id, &u1.id).await.unwrap();
        assert!(db.find_active_follow(&u2.id, &u1.id).await.unwrap().is_some());

        let post = service.create(&u1.id, "for my followers").await.unwrap();
        let feed = service.list_by_following_graph(&u2.id, Page::FIRST).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, post.id);

        service.remove(&post.id, &u1.id).await.unwrap();

        // A fresh fingerprint (another page) reads through to the store
        let page_two = service
            .list_by_following_graph(&u2.id, Page::new(2).unwrap())
            .await
            .unwrap();
        assert!(page_two.is_empty());

        let fresh = PostService::new(db, test_cache(), quiet_publisher(), PAGE_SIZE);
        let feed = fresh.list_by_following_graph(&u2.id, Page::FIRST).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn deleted_author_can_no_longer_edit_or_remove() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = seed_account(&db, "alice").await;
        let service = service(db.clone());

        let post = service.create(&alice.id, "before deletion").await.unwrap();
        assert!(db.delete_account(&alice.id, Utc::now()).await.unwrap());

        assert!(matches!(
            service.update(&post.id, &alice.id, "edited by deleted").await,
            Err(AppError::NotFound("Account"))
        ));
        assert!(matches!(
            service.remove(&post.id, &alice.id).await,
            Err(AppError::NotFound("Account"))
        ));
        assert_eq!(service.get(&post.id).await.unwrap().content, "before deletion");
    }
}
