//! Retry with exponential back-off and jitter for Sheets API calls.

use std::future::Future;
use std::time::Duration;

use crate::error::SheetsError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: timeouts, connection failures, HTTP 429 and 5xx.
/// Everything else (4xx, malformed bodies, bad sheet references) fails fast.
pub(crate) fn is_retriable(err: &SheetsError) -> bool {
    match err {
        SheetsError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        SheetsError::Timeout { .. } | SheetsError::RateLimited { .. } => true,
        SheetsError::UnexpectedStatus { status, .. } => *status >= 500,
        SheetsError::Deserialize { .. } | SheetsError::InvalidSheetRef(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The sleep before retry `n` is `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`, capped at
/// 60 s. A `Retry-After` hint on a 429 raises the delay to at least that value.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SheetsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SheetsError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let floor_ms = match &err {
                    SheetsError::RateLimited {
                        retry_after_secs: Some(secs),
                    } => secs.saturating_mul(1_000).min(MAX_DELAY_MS),
                    _ => 0,
                };
                let delay_ms = jittered.max(floor_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "Sheets API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
