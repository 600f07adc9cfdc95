//! Socialnet - accounts, follow graph, posts, comments and reactions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - JSON handlers, caller extraction, metrics                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Ownership, exclusivity and follow rules                  │
//! │  - Cache-aside listings                                     │
//! └─────────────────────────────────────────────────────────────┘
//!                   │                          │
//! ┌──────────────────────────────┐  ┌──────────────────────────┐
//! │          Data Layer          │  │      Notifications       │
//! │  - SQLite (sqlx)             │  │  - in-process queue      │
//! │  - Moka response cache       │  │  - background consumer   │
//! └──────────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `notification`: Event publishing and fan-out
//! - `data`: Repositories, SQLite and the response cache
//! - `auth`: Passwords, session tokens and caller extraction
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod notification;
pub mod service;

use std::sync::Arc;

use notification::{LogSink, NotificationPublisher, NotificationSink};

/// Application state shared across all handlers
///
/// Cloned per request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Read-path response cache (volatile)
    pub cache: Arc<data::ResponseCache>,

    /// Notification queue handle shared by every service
    pub publisher: Arc<dyn NotificationPublisher>,

    pub accounts: Arc<service::AccountGraphService>,
    pub posts: Arc<service::PostService>,
    pub comments: Arc<service::CommentService>,
    pub interactions: Arc<service::InteractionService>,
}

impl AppState {
    /// Initialize application state with notifications written to the log
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_notification_sink(config, Arc::new(LogSink)).await
    }

    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Initialize the response cache
    /// 3. Start the notification consumer (unless disabled)
    /// 4. Build services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn with_notification_sink(
        config: config::AppConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(
            data::Database::connect_with(&config.database.path, config.database.max_connections)
                .await?,
        );
        tracing::info!("Database connected");

        // 2. Initialize cache
        let cache = Arc::new(data::ResponseCache::in_memory(
            config.cache.ttl(),
            config.cache.max_capacity,
        ));
        tracing::info!(
            ttl_seconds = config.cache.ttl_seconds,
            max_capacity = config.cache.max_capacity,
            "Response cache initialized"
        );

        // 3. Start notification consumer
        let publisher: Arc<dyn NotificationPublisher> = if config.notifications.enabled {
            let (publisher, _consumer) =
                notification::spawn_notification_consumer(db.clone(), sink);
            tracing::info!("Notification consumer spawned");
            publisher
        } else {
            tracing::info!("Notifications disabled");
            Arc::new(notification::DisabledPublisher)
        };

        // 4. Build services
        let page_size = config.pagination.page_size;
        let accounts = service::AccountGraphService::new(
            db.clone(),
            publisher.clone(),
            config.auth.clone(),
            page_size,
        );
        let posts = service::PostService::new(db.clone(), cache.clone(), publisher.clone(), page_size);
        let comments =
            service::CommentService::new(db.clone(), cache.clone(), publisher.clone(), page_size);
        let interactions = service::InteractionService::new(db.clone(), publisher.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            cache,
            publisher,
            accounts: Arc::new(accounts),
            posts: Arc::new(posts),
            comments: Arc::new(comments),
            interactions: Arc::new(interactions),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = state.config.server.request_timeout();

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::accounts_router())
        .merge(api::posts_router())
        .merge(api::comments_router())
        .merge(api::interactions_router())
        .layer(axum::middleware::from_fn(api::track_http_metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
