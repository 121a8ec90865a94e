//! Request limits and argument validation
//!
//! Validation runs before the cache or the concurrency guard is touched, so a
//! bad request never waits on a lock or triggers a load.

use crate::error::{ListServError, ListServResult};

/// Default upper bound on `take` for list/search pagination
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 1000;

/// Default cap on link specifiers processed per request
pub const DEFAULT_MAX_LINKED_DATASETS: usize = 10;

/// Reject a missing or whitespace-only argument
pub fn require_non_blank(value: &str, what: &str) -> ListServResult<()> {
    if value.trim().is_empty() {
        return Err(ListServError::validation(format!(
            "{} must not be blank",
            what
        )));
    }
    Ok(())
}

/// Check a `skip`/`take` window against the configured maximum
///
/// `skip` is unsigned so it can never be negative; `take` must be in `1..=max_take`.
pub fn validate_page(take: usize, max_take: usize) -> ListServResult<()> {
    if take == 0 {
        return Err(ListServError::validation("take must be at least 1"));
    }
    if take > max_take {
        return Err(ListServError::validation(format!(
            "take must not exceed {} (got {})",
            max_take, take
        )));
    }
    Ok(())
}
