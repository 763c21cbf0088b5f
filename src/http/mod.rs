//! HTTP transport: request plumbing, response classification and retry policy.

mod client;
mod request;
mod response;
mod retry;

#[cfg(test)]
pub use client::MockTransport;
pub use client::{GetResult, HttpClient, Transport, UploadOutcome, user_agent};
pub use request::{RawResponse, Request};
pub use response::{LOG_HEADER, NO_RESPONSE, REQUEST_ID_HEADER, ResponseInfo};
pub use retry::{NON_RETRYABLE_SERVER_CODES, RATE_LIMITED_CODES, is_retryable_status};
