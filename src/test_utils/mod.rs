mod object_builder;
mod scripted_transport;

pub use object_builder::*;
pub use scripted_transport::*;

use std::time::Duration;

/// Poll `cond` until it holds or `timeout_ms` elapses. Returns whether the
/// condition was met.
pub async fn wait_until<F>(
    cond: F,
    timeout_ms: u64,
) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
