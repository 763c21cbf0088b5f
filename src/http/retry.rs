//! Retry policy: which outcomes callers may re-issue, and the engine-level
//! reconnect loop fed by [`Config::connection_retries`](crate::Config).

use anyhow::Result;
use log::warn;

/// 5xx codes that must not be retried. 579 means the upload itself
/// succeeded but the server-side callback failed; re-sending would
/// duplicate the upload.
pub const NON_RETRYABLE_SERVER_CODES: &[i32] = &[579];

/// Application-defined throttling codes that are retried despite not being 5xx.
pub const RATE_LIMITED_CODES: &[i32] = &[996];

/// Whether a response with this status may be re-issued.
pub fn is_retryable_status(code: i32) -> bool {
    (code / 100 == 5 && !NON_RETRYABLE_SERVER_CODES.contains(&code))
        || RATE_LIMITED_CODES.contains(&code)
}

/// True when the request never got a connection to the server.
pub(crate) fn is_connect_failure(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(reqwest::Error::is_connect)
}

/// Runs a blocking send, re-sending up to `retries` times on connect failures.
pub(crate) fn with_connect_retries<F, T>(operation_name: &str, retries: usize, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt < retries && is_connect_failure(&e) => {
                attempt += 1;
                warn!(
                    "{}: connect failed ({}), reconnect {}/{}...",
                    operation_name, e, attempt, retries
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Async counterpart of [`with_connect_retries`].
pub(crate) async fn with_connect_retries_async<F, Fut, T>(
    operation_name: &str,
    retries: usize,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < retries && is_connect_failure(&e) => {
                attempt += 1;
                warn!(
                    "{}: connect failed ({}), reconnect {}/{}...",
                    operation_name, e, attempt, retries
                );
            }
            Err(e) => return Err(e),
        }
    }
}
