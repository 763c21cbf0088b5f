use anyhow::Result;
use log::{debug, info};
use std::path::PathBuf;

use super::{failure, token_auth};
use crate::form::{FileAttachment, UploadForm};
use crate::http::{Transport, UploadOutcome};

/// What to send in one multipart upload.
#[derive(Debug, Default, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub fields: Vec<(String, String)>,
    /// Form key and local path; the part's filename is the path's basename.
    pub files: Vec<(String, PathBuf)>,
    pub token: Option<String>,
}

impl UploadRequest {
    fn into_form(self) -> (String, UploadForm, Option<String>) {
        let mut form = UploadForm::new();
        for (name, value) in self.fields {
            form.add_field(name, value);
        }
        for (key, path) in self.files {
            form.add_file(key, FileAttachment::new(path));
        }
        (self.url, form, self.token)
    }
}

/// Uploads the form and returns the server's response body.
#[tracing::instrument(skip(transport, request), fields(url = %request.url))]
pub async fn upload(transport: &dyn Transport, request: UploadRequest) -> Result<String> {
    let (url, form, token) = request.into_form();
    let outcome = transport
        .post(&url, form, token_auth(token.as_deref()))
        .await;
    debug!("POST {}: {}", url, outcome.info());

    match outcome {
        UploadOutcome::Completed(response, info) if info.ok() => {
            info!("Uploaded to {} (reqid {})", url, info.req_id().unwrap_or("-"));
            Ok(response.text().into_owned())
        }
        other => Err(failure("POST", other.info())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, RawResponse, ResponseInfo};
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use std::io::Write;

    fn completed(status: u16, body: &'static str) -> UploadOutcome {
        let response = RawResponse::new(status, HeaderMap::new(), Bytes::from_static(body.as_bytes()));
        let info = ResponseInfo::from_response(&response);
        UploadOutcome::Completed(response, info)
    }

    #[tokio::test]
    async fn test_upload_encodes_fields_and_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG\r\n").unwrap();
        let path = file.path().to_path_buf();
        let basename = path.file_name().unwrap().to_string_lossy().into_owned();

        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|url, form, auth| {
                url == "http://up.example.com/" && form.boundary().len() == 32 && auth.is_some()
            })
            .times(1)
            .returning(move |_, form, _| {
                let (body, _) = form.encode().unwrap();
                let body = String::from_utf8_lossy(&body).into_owned();
                assert!(body.contains("name=\"key\"\r\n\r\nx.png\r\n"));
                assert!(body.contains(&format!("name=\"file\"; filename=\"{}\"", basename)));
                completed(200, r#"{"key":"x.png"}"#)
            });

        let body = upload(
            &transport,
            UploadRequest {
                url: "http://up.example.com/".to_string(),
                fields: vec![("key".to_string(), "x.png".to_string())],
                files: vec![("file".to_string(), path)],
                token: Some("up-token".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(body, r#"{"key":"x.png"}"#);
    }

    #[tokio::test]
    async fn test_upload_error_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .returning(|_, _, _| completed(614, r#"{"error":"file exists"}"#));

        let err = upload(
            &transport,
            UploadRequest {
                url: "http://up.example.com/".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "POST failed with status 614: file exists");
    }

    #[tokio::test]
    async fn test_upload_interrupted() {
        let mut transport = MockTransport::new();
        transport.expect_post().returning(|_, _, _| {
            UploadOutcome::Interrupted(None, ResponseInfo::from_error(anyhow::anyhow!("connection reset")))
        });

        let err = upload(&transport, UploadRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(err.to_string().contains("retryable"));
    }
}
