//! Bounded retry for storage operations

use crate::config::RetryConfig;
use listserv_core::ListServResult;
use tracing::warn;

/// Run `op`, retrying retryable failures with exponential backoff
///
/// Validation and not-found failures are returned at once. Each failed
/// attempt that will be retried is logged at warn; the last error is returned
/// once `config.max_retries` retries are spent.
pub fn with_retry<T, F>(config: &RetryConfig, operation: &str, mut op: F) -> ListServResult<T>
where
    F: FnMut() -> ListServResult<T>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.calculate_delay(attempt);
                warn!(
                    target: "listserv::store",
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Storage operation failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
