//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Session tokens
//! - Caller extraction for handlers

mod middleware;
pub mod password;
pub mod session;

pub use middleware::{CurrentAccount, SESSION_COOKIE};
pub use password::{hash_password, verify_password};
pub use session::{Session, create_session_token, verify_session_token};
