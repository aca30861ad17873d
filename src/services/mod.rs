pub mod embedding;
pub mod expansion;
pub mod orchestrator;
pub mod semantic;
pub mod spatial;
pub mod substitution;
pub mod user_routes;
pub mod vector_index;

use crate::constants::{UPSTREAM_RETRY_ATTEMPTS, UPSTREAM_RETRY_BASE_DELAY_MS};
use std::future::Future;
use std::time::Duration;

/// Outcome of one upstream attempt: transient failures are retried with
/// exponential backoff, fatal ones surface immediately.
pub(crate) enum UpstreamError {
    Transient(String),
    Fatal(String),
}

/// Run `attempt` up to the configured retry bound, backing off between
/// transient failures. Returns the final error message on exhaustion.
pub(crate) async fn with_retries<T, F, Fut>(label: &str, mut attempt: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(UpstreamError::Fatal(msg)) => return Err(msg),
            Err(UpstreamError::Transient(msg)) => {
                if tries >= UPSTREAM_RETRY_ATTEMPTS {
                    return Err(msg);
                }
                let delay = UPSTREAM_RETRY_BASE_DELAY_MS * 2u64.pow(tries - 1);
                tracing::warn!(
                    attempt = tries,
                    delay_ms = delay,
                    "{} failed transiently: {}. Retrying",
                    label,
                    msg
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
