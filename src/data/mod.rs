//! Data layer module
//!
//! Handles all data persistence and caching:
//! - Repository contracts and their SQLite implementation
//! - Read-path response cache (volatile)

mod cache;
mod database;
mod models;
mod repository;

pub use cache::{CacheLookup, CacheStore, Fingerprint, MemoryCacheStore, ResponseCache};
pub use database::Database;
pub use models::*;
pub use repository::*;
