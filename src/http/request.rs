//! Requests and responses as plain data.
//!
//! Auth strategies sign a [`Request`] and the classifier reads a
//! [`RawResponse`]; neither depends on which engine (blocking or async)
//! carries the call.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// A fully built outgoing request, body included.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// The `Content-Type` header, if set and printable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// A response as received: status line, headers, and the whole body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A header value, if present. Bytes outside visible ASCII are decoded
    /// as (lossy) UTF-8 rather than dropped.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderValue};

    #[test]
    fn test_request_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = Request::new(
            Method::POST,
            Url::parse("http://up.example.com/").unwrap(),
            headers,
            Bytes::from_static(b"hi"),
        );
        assert_eq!(request.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-reqid", HeaderValue::from_static("abc"));
        let response = RawResponse::new(200, headers, Bytes::new());
        assert_eq!(response.header("X-Reqid").as_deref(), Some("abc"));
        assert_eq!(response.header("X-Log"), None);
    }

    #[test]
    fn test_response_header_keeps_non_ascii_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-log",
            HeaderValue::from_bytes("UP:上传;RS:1".as_bytes()).unwrap(),
        );
        headers.insert("x-reqid", HeaderValue::from_bytes(b"id-\xff").unwrap());
        let response = RawResponse::new(200, headers, Bytes::new());

        assert_eq!(response.header("X-Log").as_deref(), Some("UP:上传;RS:1"));
        assert_eq!(response.header("X-Reqid").as_deref(), Some("id-\u{fffd}"));
    }

    #[test]
    fn test_response_json() {
        let response = RawResponse::new(200, HeaderMap::new(), Bytes::from_static(br#"{"a":1}"#));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(response.text(), r#"{"a":1}"#);
    }
}
