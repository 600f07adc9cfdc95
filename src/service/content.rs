//! Rules shared by the post, comment and interaction services

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::data::{Account, AccountRepository, CacheLookup, Fingerprint, Page, ResponseCache};
use crate::error::{AppError, Result};

pub(crate) const MAX_CONTENT_CHARS: usize = 5000;

/// Trim user-supplied text and enforce the content length bounds
pub(crate) fn normalize_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "content cannot exceed {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn ensure_owner(owner_id: &str, caller_id: &str) -> Result<()> {
    if owner_id != caller_id {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub(crate) async fn require_active_account(
    accounts: &dyn AccountRepository,
    account_id: &str,
) -> Result<Account> {
    accounts
        .find_active_account(account_id)
        .await?
        .ok_or(AppError::NotFound("Account"))
}

/// LIMIT/OFFSET pair for a page
pub(crate) fn window(page: Page, page_size: u32) -> (i64, i64) {
    (i64::from(page_size), page.offset(page_size))
}

/// Fingerprint for a paginated GET route
pub(crate) fn list_fingerprint(
    path: &str,
    params: &[(&str, String)],
    page: Page,
    caller_id: &str,
) -> Fingerprint {
    let mut params = params.to_vec();
    params.push(("page", page.number().to_string()));
    Fingerprint::new("GET", path, &params, caller_id)
}

/// Cache-aside read: serve a hit, otherwise load and populate on success
pub(crate) async fn cache_aside<T, F, Fut>(
    cache: &ResponseCache,
    fingerprint: Fingerprint,
    load: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let CacheLookup::Hit(value) = cache.get(&fingerprint).await {
        return Ok(value);
    }

    let value = load().await?;
    cache.put(&fingerprint, &value).await;
    Ok(value)
}
