//! Retry Runner: the single place retries happen in the pipeline.
//!
//! Neither the Model Abstraction nor the drivers retry internally; every
//! retryable unit of work is wrapped by [`run_with_retries`].

use std::future::Future;
use std::time::Duration;

const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;

/// Runs `operation` up to `max_retries + 1` times, with exponential backoff
/// between attempts (base 200ms, doubling, capped at 5s). `page_tag` is
/// logged alongside each failure so retries can be attributed to a page in
/// concurrent runs.
pub async fn run_with_retries<F, Fut, T, E>(mut operation: F, max_retries: u32, page_tag: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_retries => {
                tracing::warn!(page = %page_tag, attempt, %error, "retrying after failure");
                let backoff = (BASE_BACKOFF_MS.saturating_mul(1 << attempt)).min(MAX_BACKOFF_MS);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                attempt += 1;
            }
            Err(error) => {
                tracing::error!(page = %page_tag, attempts = attempt + 1, %error, "exhausted retry budget");
                return Err(error);
            }
        }
    }
}
