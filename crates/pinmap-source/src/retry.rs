//! Retry with exponential back-off and jitter for site fetches.
//!
//! Transient failures (timeouts, refused connections, 5xx) are retried.
//! Client errors and malformed bodies are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

const MAX_DELAY_MS: u64 = 30_000;

pub(crate) fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        SourceError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        SourceError::Deserialize { .. }
        | SourceError::InvalidBaseUrl { .. }
        | SourceError::NotConfigured => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors. The n-th retry sleeps `backoff_base_ms × 2ⁿ⁻¹` ± 25 %, never more than
/// 30 s including jitter.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "site provider transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    jittered.min(MAX_DELAY_MS)
}
