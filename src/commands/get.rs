use anyhow::Result;
use log::debug;

use super::{failure, token_auth};
use crate::http::Transport;

/// Runs a GET and returns the JSON result, or an error built from the envelope.
#[tracing::instrument(skip(transport, params, token))]
pub fn get(
    transport: &dyn Transport,
    url: &str,
    params: &[(String, String)],
    token: Option<&str>,
) -> Result<serde_json::Value> {
    let (result, info) = transport.get(url, params, token_auth(token));
    debug!("GET {}: {}", url, info);

    result.ok_or_else(|| failure("GET", &info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, RawResponse, ResponseInfo};
    use bytes::Bytes;
    use reqwest::header::HeaderMap;

    fn info(status: u16, body: &'static str) -> ResponseInfo {
        ResponseInfo::from_response(&RawResponse::new(
            status,
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        ))
    }

    #[test]
    fn test_get_returns_result() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, params, auth| {
                url == "http://rs.example.com/stat"
                    && params == [("key".to_string(), "abc".to_string())]
                    && auth.is_none()
            })
            .times(1)
            .returning(|_, _, _| {
                (
                    Some(serde_json::json!({"name": "abc"})),
                    info(200, r#"{"name":"abc"}"#),
                )
            });

        let result = get(
            &transport,
            "http://rs.example.com/stat",
            &[("key".to_string(), "abc".to_string())],
            None,
        )
        .unwrap();

        assert_eq!(result, serde_json::json!({"name": "abc"}));
    }

    #[test]
    fn test_get_passes_token() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|_, _, auth| auth.is_some())
            .times(1)
            .returning(|_, _, _| (Some(serde_json::json!({})), info(200, "")));

        assert!(get(&transport, "http://rs.example.com/", &[], Some("tok")).is_ok());
    }

    #[test]
    fn test_get_surfaces_envelope_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _, _| (None, info(612, r#"{"error":"no such file"}"#)));

        let err = get(&transport, "http://rs.example.com/stat", &[], None).unwrap_err();
        assert_eq!(err.to_string(), "GET failed with status 612: no such file");
    }
}
