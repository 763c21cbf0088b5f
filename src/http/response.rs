//! Response classification.
//!
//! Every call ends in a [`ResponseInfo`], whether the server answered with
//! success, answered with an error, or was never reached. Callers decide on
//! retries through [`ResponseInfo::need_retry`] instead of inspecting status
//! codes themselves.

use bytes::Bytes;
use log::debug;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::request::RawResponse;
use super::retry::is_retryable_status;

/// Extended header carrying the server-side request id.
pub const REQUEST_ID_HEADER: &str = "X-Reqid";
/// Extended header carrying the server-side trace log.
pub const LOG_HEADER: &str = "X-Log";

/// Status code used when no response was received.
pub const NO_RESPONSE: i32 = -1;

const UNKNOWN_ERROR: &str = "unknown";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<serde_json::Value>,
}

/// Immutable outcome of one call.
#[derive(Clone)]
pub struct ResponseInfo {
    status_code: i32,
    text_body: Option<Bytes>,
    req_id: Option<String>,
    x_log: Option<String>,
    error: Option<String>,
    exception: Option<Arc<anyhow::Error>>,
    responded: bool,
}

impl ResponseInfo {
    /// Classifies whatever the call produced. A response always wins over an
    /// exception; with neither, the call counts as a transport failure.
    pub fn classify(response: Option<&RawResponse>, exception: Option<anyhow::Error>) -> Self {
        match (response, exception) {
            (Some(response), _) => Self::from_response(response),
            (None, Some(e)) => Self::from_error(e),
            (None, None) => Self::transport_failure(None, "no response received".to_string()),
        }
    }

    pub fn from_response(response: &RawResponse) -> Self {
        let status_code = i32::from(response.status);
        let error = (status_code >= 400).then(|| extract_error(&response.body));

        let info = Self {
            status_code,
            text_body: Some(response.body.clone()),
            req_id: response.header(REQUEST_ID_HEADER).map(Cow::into_owned),
            x_log: response.header(LOG_HEADER).map(Cow::into_owned),
            error,
            exception: None,
            responded: true,
        };
        debug!("Classified response: {}", info);
        info
    }

    /// The call never produced a response; `e` is why.
    pub fn from_error(e: anyhow::Error) -> Self {
        let message = format!("{:#}", e);
        Self::transport_failure(Some(Arc::new(e)), message)
    }

    fn transport_failure(exception: Option<Arc<anyhow::Error>>, error: String) -> Self {
        let info = Self {
            status_code: NO_RESPONSE,
            text_body: None,
            req_id: None,
            x_log: None,
            error: Some(error),
            exception,
            responded: false,
        };
        debug!("Classified transport failure: {}", info);
        info
    }

    /// HTTP status, or [`NO_RESPONSE`] (`-1`).
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    pub fn text_body(&self) -> Option<&Bytes> {
        self.text_body.as_ref()
    }

    /// The body decoded as (lossy) UTF-8.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        self.text_body.as_deref().map(String::from_utf8_lossy)
    }

    pub fn req_id(&self) -> Option<&str> {
        self.req_id.as_deref()
    }

    pub fn x_log(&self) -> Option<&str> {
        self.x_log.as_deref()
    }

    /// Set for statuses >= 400 and for transport failures.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn exception(&self) -> Option<&anyhow::Error> {
        self.exception.as_deref()
    }

    /// Exactly 200; other 2xx statuses are not ok.
    pub fn ok(&self) -> bool {
        self.status_code == 200
    }

    pub fn need_retry(&self) -> bool {
        if !self.responded {
            return true;
        }
        is_retryable_status(self.status_code)
    }

    pub fn connect_failed(&self) -> bool {
        !self.responded
    }
}

/// `error` field of a JSON body, or "unknown".
fn extract_error(body: &[u8]) -> String {
    if body.is_empty() {
        return UNKNOWN_ERROR.to_string();
    }
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(serde_json::Value::String(message)),
        }) => message,
        Ok(ErrorBody { error: Some(value) }) => value.to_string(),
        _ => UNKNOWN_ERROR.to_string(),
    }
}

fn opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

impl fmt::Display for ResponseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.text().map(|t| t.into_owned());
        write!(
            f,
            "status_code:{}, text_body:{}, req_id:{}, x_log:{}, error:{}",
            self.status_code,
            opt(&body),
            opt(&self.req_id),
            opt(&self.x_log),
            opt(&self.error)
        )
    }
}

impl fmt::Debug for ResponseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseInfo")
            .field("status_code", &self.status_code)
            .field("text_body", &self.text())
            .field("req_id", &self.req_id)
            .field("x_log", &self.x_log)
            .field("error", &self.error)
            .field("exception", &self.exception.as_ref().map(|e| e.to_string()))
            .finish()
    }
}
