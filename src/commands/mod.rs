//! Command implementations behind the CLI, written against [`Transport`] so
//! they can be exercised without a network.
//!
//! [`Transport`]: crate::http::Transport

use anyhow::anyhow;
use std::sync::Arc;

use crate::auth::{Auth, TokenAuth};
use crate::http::ResponseInfo;

mod get;
mod upload;

pub use get::get;
pub use upload::{UploadRequest, upload};

/// Parses `key=value`. Only the first `=` splits; the value may be empty.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

fn token_auth(token: Option<&str>) -> Option<Arc<dyn Auth>> {
    token.map(|t| Arc::new(TokenAuth::new(t)) as Arc<dyn Auth>)
}

fn failure(operation: &str, info: &ResponseInfo) -> anyhow::Error {
    let reason = info.error().unwrap_or("unexpected status");
    let hint = if info.connect_failed() {
        " (server not reached, retryable)"
    } else if info.need_retry() {
        " (retryable)"
    } else {
        ""
    };
    match info.req_id() {
        Some(req_id) => anyhow!(
            "{} failed with status {}: {}{} [reqid {}]",
            operation,
            info.status_code(),
            reason,
            hint,
            req_id
        ),
        None => anyhow!(
            "{} failed with status {}: {}{}",
            operation,
            info.status_code(),
            reason,
            hint
        ),
    }
}
