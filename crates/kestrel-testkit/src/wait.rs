//! Polling helpers for background work.

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until<F>(condition: F) -> bool
where
    F: FnMut() -> bool,
{
    wait_until_timeout(DEFAULT_TIMEOUT, condition).await
}

/// Poll `condition` until it holds or `timeout` passes. Returns the last result.
pub async fn wait_until_timeout<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return condition();
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
