//! API layer
//!
//! Thin HTTP handlers: each one extracts the caller, unpacks JSON and calls
//! a single service method.
//! - Accounts, sessions and follows
//! - Posts, comments and interactions
//! - Metrics (Prometheus)

mod accounts;
mod comments;
mod dto;
mod interactions;
pub mod metrics;
mod posts;

pub use dto::*;

pub use accounts::accounts_router;
pub use comments::comments_router;
pub use interactions::interactions_router;
pub use metrics::{metrics_router, track_http_metrics};
pub use posts::posts_router;
